//! # Módulo del Motor de Planificación
//!
//! El motor simula la CPU tick a tick: admite los procesos que llegan,
//! despacha el siguiente proceso listo según la política, lo ejecuta un
//! tick y decide si terminó o si debe ser desalojado. Cada turno de CPU
//! queda registrado como un bloque del diagrama de Gantt.

use std::collections::VecDeque;

use tracing::debug;

use crate::error::SimError;
use crate::metrics::{MetricsCalculator, SimulationResult};
use crate::process::{Process, ProcessTable};
use crate::scheduler::{PolicyKind, SchedulingAlgorithm};
use crate::timeline::{Timeline, IDLE_ID};

/// Estado de un proceso mientras está en la cola de listos o en la CPU.
#[derive(Debug)]
struct ReadyEntry<'a> {
    process: &'a Process,
    /// Ráfaga que aún falta ejecutar
    remaining: u64,
    /// Ticks ejecutados desde el último despacho
    run_time: u64,
    /// Ticks concedidos en el despacho actual
    slice: u64,
}

impl<'a> ReadyEntry<'a> {
    fn new(process: &'a Process) -> Self {
        Self {
            process,
            remaining: process.burst_time,
            run_time: 0,
            slice: 0,
        }
    }
}

/// Motor de simulación para una política de planificación.
pub struct Engine {
    algorithm: SchedulingAlgorithm,
    calculator: MetricsCalculator,
}

impl Engine {
    /// Crea un motor para el algoritmo dado.
    ///
    /// # Errors
    ///
    /// `SimError::PrecondViolation` si el algoritmo es Round Robin con
    /// quantum 0.
    pub fn new(algorithm: SchedulingAlgorithm) -> Result<Self, SimError> {
        algorithm.validate()?;
        Ok(Self {
            algorithm,
            calculator: MetricsCalculator::new(),
        })
    }

    /// Algoritmo con el que se construyó el motor.
    pub fn algorithm(&self) -> SchedulingAlgorithm {
        self.algorithm
    }

    /// Ejecuta la simulación y devuelve el diagrama de Gantt resultante.
    ///
    /// El diagrama empieza en la llegada más temprana. Si la CPU queda sin
    /// procesos listos mientras aún hay llegadas pendientes, el reloj salta a
    /// la próxima llegada y el hueco se registra como un bloque ocioso
    /// (`IDLE_ID`). Un conjunto vacío produce un diagrama vacío con origen 0.
    ///
    /// # Errors
    ///
    /// `SimError::PrecondViolation` si algún proceso tiene ráfaga 0 o si el
    /// fin de la simulación no cabe en un `u64`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cpu_scheduling_simulator::{Engine, Process, SchedulingAlgorithm};
    ///
    /// let engine = Engine::new(SchedulingAlgorithm::sjf()).unwrap();
    /// let timeline = engine
    ///     .schedule(&[Process::new(1, 0, 5), Process::new(2, 0, 3)])
    ///     .unwrap();
    /// let order: Vec<u32> = timeline.blocks().iter().map(|b| b.id).collect();
    /// assert_eq!(order, vec![2, 1]);
    /// ```
    pub fn schedule(&self, processes: &[Process]) -> Result<Timeline, SimError> {
        validate_processes(processes)?;

        let mut sorted: Vec<&Process> = processes.iter().collect();
        sorted.sort_by(|a, b| self.algorithm.admission_order(a, b));

        let origin = sorted.first().map_or(0, |process| process.arrival_time);
        let mut timeline = Timeline::new(origin);
        let mut pending = sorted.into_iter().peekable();
        let mut ready: VecDeque<ReadyEntry<'_>> = VecDeque::new();
        let mut running: Option<ReadyEntry<'_>> = None;
        let mut idle_since: Option<u64> = None;
        let mut clock = origin;

        while pending.peek().is_some() || !ready.is_empty() || running.is_some() {
            // Admitir las llegadas de este tick
            while let Some(process) = pending.next_if(|process| process.arrival_time <= clock) {
                self.enqueue(&mut ready, ReadyEntry::new(process));
            }

            // Despachar si la CPU está libre
            if running.is_none() {
                if let Some(mut entry) = ready.pop_front() {
                    if let Some(since) = idle_since.take() {
                        timeline.append_block(IDLE_ID, clock - since);
                    }
                    entry.run_time = 0;
                    entry.slice = self.algorithm.calculate_quantum(entry.remaining);
                    debug!(
                        policy = %self.algorithm,
                        process = entry.process.id,
                        tick = clock,
                        slice = entry.slice,
                        "proceso despachado"
                    );
                    running = Some(entry);
                } else if let Some(next) = pending.peek() {
                    // CPU ociosa: saltar a la próxima llegada
                    idle_since.get_or_insert(clock);
                    clock = next.arrival_time;
                    continue;
                }
            }

            // Ejecutar un tick
            if let Some(mut entry) = running.take() {
                entry.run_time += 1;
                entry.remaining -= 1;

                if entry.remaining == 0 {
                    timeline.append_block(entry.process.id, entry.run_time);
                } else if self.algorithm.is_preemptive() && entry.run_time >= entry.slice {
                    timeline.append_block(entry.process.id, entry.run_time);
                    debug!(
                        policy = %self.algorithm,
                        process = entry.process.id,
                        remaining = entry.remaining,
                        "quantum agotado, vuelve a la cola"
                    );
                    entry.run_time = 0;
                    self.enqueue(&mut ready, entry);
                } else {
                    running = Some(entry);
                }
            }

            clock += 1;
        }

        Ok(timeline)
    }

    /// Simula y calcula los promedios de espera y retorno.
    ///
    /// Un conjunto vacío devuelve ceros sin invocar al calculador.
    pub fn simulate(&self, processes: &[Process]) -> Result<SimulationResult, SimError> {
        if processes.is_empty() {
            return Ok(SimulationResult::default());
        }
        let timeline = self.schedule(processes)?;
        self.calculator.summarize(&timeline, processes)
    }

    /// Simula y genera el reporte de texto con el diagrama de Gantt.
    pub fn report(&self, processes: &[Process]) -> Result<String, SimError> {
        let timeline = self.schedule(processes)?;
        self.calculator
            .generate_report(&self.algorithm.description(), &timeline, processes)
    }

    /// Simula una sola vez y devuelve tanto los promedios como el reporte.
    ///
    /// # Returns
    ///
    /// Los promedios y el reporte de texto, ambos calculados sobre el mismo
    /// diagrama de Gantt
    pub fn simulate_with_report(
        &self,
        processes: &[Process],
    ) -> Result<(SimulationResult, String), SimError> {
        let timeline = self.schedule(processes)?;
        let summary = self.calculator.summarize(&timeline, processes)?;
        let report =
            self.calculator
                .generate_report(&self.algorithm.description(), &timeline, processes)?;
        Ok((summary, report))
    }

    fn enqueue<'a>(&self, ready: &mut VecDeque<ReadyEntry<'a>>, entry: ReadyEntry<'a>) {
        ready.push_back(entry);
        if self.algorithm.orders_ready_queue() {
            // Ordenamiento estable: los empates conservan el orden de inserción
            ready.make_contiguous().sort_by_key(|entry| entry.remaining);
        }
    }
}

/// Rechaza ráfagas nulas y simulaciones cuyo reloj desbordaría.
fn validate_processes(processes: &[Process]) -> Result<(), SimError> {
    if let Some(process) = processes.iter().find(|process| process.burst_time == 0) {
        return Err(SimError::precondition(format!(
            "el proceso {} tiene ráfaga 0",
            process.id
        )));
    }

    let latest_arrival = processes.iter().map(|p| p.arrival_time).max().unwrap_or(0);
    processes
        .iter()
        .try_fold(latest_arrival, |end, process| end.checked_add(process.burst_time))
        .map(|_| ())
        .ok_or_else(|| SimError::precondition("el fin de la simulación excede el rango de u64"))
}

/// Simula Round Robin con el quantum dado.
///
/// # Errors
///
/// `SimError::PrecondViolation` si `quantum` es 0 o si algún proceso tiene
/// ráfaga 0.
///
/// # Examples
///
/// ```rust
/// use cpu_scheduling_simulator::{run_rr, Process};
///
/// let result = run_rr(&[Process::new(1, 0, 5)], 10).unwrap();
/// assert_eq!(result.average_waiting_time, 0.0);
/// assert_eq!(result.average_turnaround_time, 5.0);
/// ```
pub fn run_rr(processes: &[Process], quantum: u32) -> Result<SimulationResult, SimError> {
    Engine::new(SchedulingAlgorithm::round_robin(quantum))?.simulate(processes)
}

/// Simula Shortest-Job-First no preemptivo.
pub fn run_sjf(processes: &[Process]) -> Result<SimulationResult, SimError> {
    Engine::new(SchedulingAlgorithm::sjf())?.simulate(processes)
}

/// Simula una tabla de procesos con la política indicada, usando el
/// quantum de la tabla cuando la política es Round Robin.
pub fn run_table(kind: PolicyKind, table: &ProcessTable) -> Result<SimulationResult, SimError> {
    Engine::new(SchedulingAlgorithm::for_kind(kind, table.quantum))?.simulate(&table.processes)
}

/// Igual que [`run_table`], pero además genera el reporte con el diagrama
/// de Gantt a partir de la misma simulación.
pub fn run_table_with_report(
    kind: PolicyKind,
    table: &ProcessTable,
) -> Result<(SimulationResult, String), SimError> {
    Engine::new(SchedulingAlgorithm::for_kind(kind, table.quantum))?
        .simulate_with_report(&table.processes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::TimelineBlock;

    fn block(id: u32, start_time: u64, end_time: u64) -> TimelineBlock {
        TimelineBlock { id, start_time, end_time }
    }

    fn rr(quantum: u32) -> Engine {
        Engine::new(SchedulingAlgorithm::round_robin(quantum)).unwrap()
    }

    fn sjf() -> Engine {
        Engine::new(SchedulingAlgorithm::sjf()).unwrap()
    }

    #[test]
    fn test_empty_process_set_yields_zero_metrics() {
        assert_eq!(run_rr(&[], 3).unwrap(), SimulationResult::default());
        assert_eq!(run_sjf(&[]).unwrap(), SimulationResult::default());

        let timeline = rr(3).schedule(&[]).unwrap();
        assert!(timeline.is_empty());
        assert_eq!(timeline.origin(), 0);
    }

    #[test]
    fn test_zero_quantum_is_precondition_violation() {
        assert!(matches!(
            run_rr(&[Process::new(1, 0, 2)], 0),
            Err(SimError::PrecondViolation(_))
        ));
        assert!(Engine::new(SchedulingAlgorithm::round_robin(0)).is_err());
    }

    #[test]
    fn test_single_process_runs_in_one_block() {
        let processes = [Process::new(1, 0, 5)];
        let timeline = rr(10).schedule(&processes).unwrap();
        assert_eq!(timeline.blocks(), &[block(1, 0, 5)]);

        let result = run_rr(&processes, 10).unwrap();
        assert_eq!(result.average_waiting_time, 0.0);
        assert_eq!(result.average_turnaround_time, 5.0);
    }

    #[test]
    fn test_timeline_starts_at_earliest_arrival() {
        let processes = [Process::new(1, 4, 2), Process::new(2, 3, 1)];
        let timeline = sjf().schedule(&processes).unwrap();
        assert_eq!(timeline.origin(), 3);
        assert_eq!(timeline.blocks(), &[block(2, 3, 4), block(1, 4, 6)]);
    }

    #[test]
    fn test_round_robin_preempts_and_requeues() {
        let processes = [
            Process::new(1, 0, 5),
            Process::new(2, 1, 3),
            Process::new(3, 2, 1),
        ];
        let timeline = rr(2).schedule(&processes).unwrap();
        assert_eq!(
            timeline.blocks(),
            &[
                block(1, 0, 2),
                block(2, 2, 4),
                block(1, 4, 6),
                block(3, 6, 7),
                block(2, 7, 8),
                block(1, 8, 9),
            ]
        );

        let result = run_rr(&processes, 2).unwrap();
        assert_eq!(result.average_waiting_time, 4.0);
        assert_eq!(result.average_turnaround_time, 7.0);
    }

    #[test]
    fn test_round_robin_with_large_quantum_is_fcfs() {
        let processes = [
            Process::new(1, 0, 4),
            Process::new(2, 1, 3),
            Process::new(3, 1, 2),
        ];
        let timeline = rr(100).schedule(&processes).unwrap();
        assert_eq!(
            timeline.blocks(),
            &[block(1, 0, 4), block(2, 4, 7), block(3, 7, 9)]
        );
    }

    #[test]
    fn test_sjf_tie_break_on_equal_arrival() {
        let processes = [Process::new(1, 0, 5), Process::new(2, 0, 3)];
        let timeline = sjf().schedule(&processes).unwrap();
        assert_eq!(timeline.blocks(), &[block(2, 0, 3), block(1, 3, 8)]);

        let result = run_sjf(&processes).unwrap();
        assert_eq!(result.average_waiting_time, 1.5);
        assert_eq!(result.average_turnaround_time, 5.5);
    }

    #[test]
    fn test_sjf_is_not_preemptive() {
        let processes = [
            Process::new(1, 0, 6),
            Process::new(2, 1, 2),
            Process::new(3, 2, 1),
        ];
        let timeline = sjf().schedule(&processes).unwrap();
        assert_eq!(
            timeline.blocks(),
            &[block(1, 0, 6), block(3, 6, 7), block(2, 7, 9)]
        );
    }

    #[test]
    fn test_sjf_equal_bursts_keep_insertion_order() {
        let processes = [
            Process::new(1, 0, 4),
            Process::new(2, 1, 2),
            Process::new(3, 2, 2),
        ];
        let timeline = sjf().schedule(&processes).unwrap();
        let order: Vec<u32> = timeline.blocks().iter().map(|b| b.id).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_idle_gap_is_recorded() {
        let processes = [Process::new(1, 0, 2), Process::new(2, 5, 3)];
        let timeline = sjf().schedule(&processes).unwrap();
        assert_eq!(
            timeline.blocks(),
            &[block(1, 0, 2), block(IDLE_ID, 2, 5), block(2, 5, 8)]
        );
        assert_eq!(timeline.busy_time(), 5);

        let result = run_sjf(&processes).unwrap();
        assert_eq!(result.average_waiting_time, 0.0);
        assert_eq!(result.average_turnaround_time, 2.5);
    }

    #[test]
    fn test_executed_time_matches_burst_for_every_process() {
        let sets = [
            vec![Process::new(1, 0, 7), Process::new(2, 2, 4), Process::new(3, 4, 1)],
            vec![Process::new(1, 3, 9), Process::new(2, 0, 2), Process::new(3, 20, 5)],
            vec![Process::new(1, 1, 1), Process::new(2, 1, 1), Process::new(3, 1, 6)],
        ];

        for processes in &sets {
            for engine in [rr(1), rr(3), sjf()] {
                let timeline = engine.schedule(processes).unwrap();
                for process in processes {
                    let executed: u64 = timeline
                        .blocks_for(process.id)
                        .map(TimelineBlock::duration)
                        .sum();
                    assert_eq!(executed, process.burst_time, "{}", engine.algorithm());
                }
                let total: u64 = processes.iter().map(|p| p.burst_time).sum();
                assert_eq!(timeline.busy_time(), total);
            }
        }
    }

    #[test]
    fn test_run_table_uses_table_quantum() {
        let table = ProcessTable {
            quantum: 2,
            processes: vec![Process::new(1, 0, 5), Process::new(2, 1, 3), Process::new(3, 2, 1)],
        };
        let rr_result = run_table(PolicyKind::RoundRobin, &table).unwrap();
        assert_eq!(rr_result.average_turnaround_time, 7.0);

        let zero = ProcessTable { quantum: 0, ..table.clone() };
        assert!(run_table(PolicyKind::RoundRobin, &zero).is_err());
        assert!(run_table(PolicyKind::ShortestJobFirst, &zero).is_ok());
    }

    #[test]
    fn test_report_includes_gantt() {
        let report = sjf()
            .report(&[Process::new(1, 0, 5), Process::new(2, 0, 3)])
            .unwrap();
        assert!(report.contains("Shortest-Job-First"));
        assert!(report.contains("|_2_|__1__|"));
    }

    #[test]
    fn test_zero_burst_is_precondition_violation() {
        let processes = [Process::new(1, 0, 3), Process::new(2, 1, 0)];
        assert!(matches!(
            sjf().schedule(&processes),
            Err(SimError::PrecondViolation(_))
        ));
        assert!(matches!(
            run_sjf(&processes),
            Err(SimError::PrecondViolation(_))
        ));
        assert!(matches!(
            run_rr(&processes, 2),
            Err(SimError::PrecondViolation(_))
        ));
    }

    #[test]
    fn test_distant_arrival_skips_idle_ticks() {
        let far = 1_000_000_000_000;
        let processes = [Process::new(1, 0, 2), Process::new(2, far, 3)];
        let timeline = rr(2).schedule(&processes).unwrap();
        assert_eq!(
            timeline.blocks(),
            &[
                block(1, 0, 2),
                block(IDLE_ID, 2, far),
                block(2, far, far + 2),
                block(2, far + 2, far + 3),
            ]
        );
    }

    #[test]
    fn test_clock_overflow_is_rejected() {
        let processes = [Process::new(1, u64::MAX - 1, 5)];
        assert!(matches!(
            sjf().schedule(&processes),
            Err(SimError::PrecondViolation(_))
        ));
    }

    #[test]
    fn test_report_and_averages_come_from_one_run() {
        let table = ProcessTable {
            quantum: 2,
            processes: vec![Process::new(1, 0, 5), Process::new(2, 1, 3)],
        };
        let (result, report) = run_table_with_report(PolicyKind::RoundRobin, &table).unwrap();
        assert_eq!(result, run_table(PolicyKind::RoundRobin, &table).unwrap());
        assert!(report.contains("Round Robin"));
        assert!(report.contains(&format!("{:.3}", result.average_waiting_time)));
    }
}
