//! # Módulo de Métricas y Reportes
//!
//! Este módulo calcula los tiempos de espera y de retorno (turnaround) a
//! partir del diagrama de Gantt de una simulación y genera reportes de
//! texto y CSV con los resultados.

use std::fmt;

use crate::error::SimError;
use crate::process::Process;
use crate::timeline::Timeline;

/// Métricas agregadas de una simulación.
///
/// Ambos promedios son 0 cuando el conjunto de procesos está vacío.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimulationResult {
    /// Tiempo promedio de espera en la cola de listos
    pub average_waiting_time: f64,
    /// Tiempo promedio desde la llegada hasta la finalización
    pub average_turnaround_time: f64,
}

impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tiempo promedio de retorno = {:.6}, Tiempo promedio de espera = {:.6}",
            self.average_turnaround_time, self.average_waiting_time
        )
    }
}

/// Métricas individuales de un proceso.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessMetrics {
    pub process_id: u32,
    pub arrival_time: u64,
    pub burst_time: u64,
    /// Suma de los huecos entre la llegada (o el último bloque) y cada bloque
    pub waiting_time: u64,
    /// Fin del último bloque menos la llegada
    pub turnaround_time: u64,
    /// Fin del último bloque del proceso
    pub completion_time: u64,
}

/// Calculadora de métricas para la simulación.
///
/// Proporciona métodos para calcular métricas individuales y agregadas,
/// así como para generar reportes formateados de los resultados.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Crea una nueva instancia del calculador de métricas.
    pub fn new() -> Self {
        Self
    }

    /// Calcula las métricas de un proceso a partir de sus bloques.
    ///
    /// # Errors
    ///
    /// `SimError::PrecondViolation` si el proceso no tiene bloques en el
    /// diagrama o si algún bloque empieza antes de su llegada.
    pub fn calculate_process_metrics(
        &self,
        timeline: &Timeline,
        process: &Process,
    ) -> Result<ProcessMetrics, SimError> {
        let mut last_end = process.arrival_time;
        let mut waiting_time = 0;

        for block in timeline.blocks_for(process.id) {
            let gap = block.start_time.checked_sub(last_end).ok_or_else(|| {
                SimError::precondition(format!(
                    "el proceso {} se ejecuta en t={} antes de estar listo (t={})",
                    process.id, block.start_time, last_end
                ))
            })?;
            waiting_time += gap;
            last_end = block.end_time;
        }

        let last = timeline.block_by_id(process.id, timeline.count_by_id(process.id))?;

        Ok(ProcessMetrics {
            process_id: process.id,
            arrival_time: process.arrival_time,
            burst_time: process.burst_time,
            waiting_time,
            turnaround_time: last.end_time - process.arrival_time,
            completion_time: last.end_time,
        })
    }

    /// Calcula las métricas de todos los procesos, en el orden recibido.
    pub fn calculate_all(
        &self,
        timeline: &Timeline,
        processes: &[Process],
    ) -> Result<Vec<ProcessMetrics>, SimError> {
        processes
            .iter()
            .map(|process| self.calculate_process_metrics(timeline, process))
            .collect()
    }

    /// Tiempo promedio de espera de los procesos.
    ///
    /// # Errors
    ///
    /// `SimError::PrecondViolation` si `processes` está vacío; el llamador
    /// debe reportar 0 en ese caso.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cpu_scheduling_simulator::{MetricsCalculator, Process, Timeline};
    ///
    /// let processes = [Process::new(1, 0, 5), Process::new(2, 0, 3)];
    /// let mut timeline = Timeline::new(0);
    /// timeline.append_block(2, 3);
    /// timeline.append_block(1, 5);
    ///
    /// let calculator = MetricsCalculator::new();
    /// assert_eq!(calculator.average_waiting_time(&timeline, &processes).unwrap(), 1.5);
    /// ```
    pub fn average_waiting_time(
        &self,
        timeline: &Timeline,
        processes: &[Process],
    ) -> Result<f64, SimError> {
        Self::require_processes(processes)?;
        let total: u64 = self
            .calculate_all(timeline, processes)?
            .iter()
            .map(|metrics| metrics.waiting_time)
            .sum();
        Ok(total as f64 / processes.len() as f64)
    }

    /// Tiempo promedio de retorno (turnaround) de los procesos.
    ///
    /// # Errors
    ///
    /// `SimError::PrecondViolation` si `processes` está vacío.
    pub fn average_turnaround_time(
        &self,
        timeline: &Timeline,
        processes: &[Process],
    ) -> Result<f64, SimError> {
        Self::require_processes(processes)?;
        let total: u64 = self
            .calculate_all(timeline, processes)?
            .iter()
            .map(|metrics| metrics.turnaround_time)
            .sum();
        Ok(total as f64 / processes.len() as f64)
    }

    /// Calcula ambos promedios, devolviendo ceros para un conjunto vacío.
    pub fn summarize(
        &self,
        timeline: &Timeline,
        processes: &[Process],
    ) -> Result<SimulationResult, SimError> {
        if processes.is_empty() {
            return Ok(SimulationResult::default());
        }

        Ok(SimulationResult {
            average_waiting_time: self.average_waiting_time(timeline, processes)?,
            average_turnaround_time: self.average_turnaround_time(timeline, processes)?,
        })
    }

    /// Genera un reporte detallado de una simulación.
    ///
    /// # Arguments
    ///
    /// * `title` - Encabezado del reporte (por ejemplo el algoritmo usado)
    /// * `timeline` - Diagrama de Gantt producido por el motor
    /// * `processes` - Procesos simulados
    ///
    /// # Returns
    ///
    /// String con el diagrama, una fila por proceso y los promedios
    pub fn generate_report(
        &self,
        title: &str,
        timeline: &Timeline,
        processes: &[Process],
    ) -> Result<String, SimError> {
        let rows = self.calculate_all(timeline, processes)?;
        let summary = self.summarize(timeline, processes)?;

        let mut report = String::new();
        report.push_str(&format!("\n=== {title} ===\n\n"));
        report.push_str("Diagrama de Gantt:\n");
        report.push_str(&Self::format_gantt(timeline));
        report.push('\n');

        report.push_str(&format!(
            "{:^6} {:^9} {:^8} {:^8} {:^9} {:^6}\n",
            "Proc", "Llegada", "Ráfaga", "Espera", "Retorno", "Fin"
        ));
        report.push_str(&format!("{}\n", "-".repeat(51)));
        for row in &rows {
            report.push_str(&format!(
                "{:^6} {:^9} {:^8} {:^8} {:^9} {:^6}\n",
                format!("P{}", row.process_id),
                row.arrival_time,
                row.burst_time,
                row.waiting_time,
                row.turnaround_time,
                row.completion_time,
            ));
        }

        report.push_str("\n=== ESTADÍSTICAS RESUMIDAS ===\n");
        report.push_str(&format!("Procesos simulados: {}\n", rows.len()));
        report.push_str(&format!(
            "Tiempo promedio de espera: {:.3}\n",
            summary.average_waiting_time
        ));
        report.push_str(&format!(
            "Tiempo promedio de retorno: {:.3}\n",
            summary.average_turnaround_time
        ));
        report.push_str(&format!(
            "Tiempo de CPU ocupado: {} de {}\n",
            timeline.busy_time(),
            timeline.end_time() - timeline.origin()
        ));

        Ok(report)
    }

    /// Genera un reporte resumido en formato CSV, una línea por proceso.
    pub fn generate_csv_report(
        &self,
        timeline: &Timeline,
        processes: &[Process],
    ) -> Result<String, SimError> {
        let mut csv = String::from("ProcessID,Arrival,Burst,Waiting,Turnaround,Completion\n");
        for row in self.calculate_all(timeline, processes)? {
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                row.process_id,
                row.arrival_time,
                row.burst_time,
                row.waiting_time,
                row.turnaround_time,
                row.completion_time
            ));
        }
        Ok(csv)
    }

    /// Dibuja el diagrama de Gantt en dos líneas: barras y eje de tiempo.
    ///
    /// Los intervalos ociosos se muestran con `-`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cpu_scheduling_simulator::{MetricsCalculator, Timeline};
    ///
    /// let mut timeline = Timeline::new(0);
    /// timeline.append_block(2, 3);
    /// timeline.append_block(1, 5);
    /// assert_eq!(
    ///     MetricsCalculator::format_gantt(&timeline),
    ///     "|_2_|__1__|\n0   3     8\n"
    /// );
    /// ```
    pub fn format_gantt(timeline: &Timeline) -> String {
        if timeline.is_empty() {
            return String::from("(sin bloques)\n");
        }

        let mut bars = String::from("|");
        let mut axis = String::new();
        for block in timeline.blocks() {
            let label = if block.is_idle() {
                "-".to_string()
            } else {
                block.id.to_string()
            };
            let start = block.start_time.to_string();
            let width = (block.duration() as usize)
                .clamp(label.len() + 2, 12)
                .max(start.len() + 1);

            bars.push_str(&format!("{label:_^width$}|"));
            axis.push_str(&format!("{start:<pad$}", pad = width + 1));
        }
        axis.push_str(&timeline.end_time().to_string());

        format!("{bars}\n{axis}\n")
    }
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCalculator {
    fn require_processes(processes: &[Process]) -> Result<(), SimError> {
        if processes.is_empty() {
            return Err(SimError::precondition(
                "no se pueden promediar métricas de un conjunto vacío de procesos",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::IDLE_ID;

    fn sjf_tie_case() -> (Vec<Process>, Timeline) {
        let processes = vec![Process::new(1, 0, 5), Process::new(2, 0, 3)];
        let mut timeline = Timeline::new(0);
        timeline.append_block(2, 3);
        timeline.append_block(1, 5);
        (processes, timeline)
    }

    #[test]
    fn test_averages_for_sjf_tie_case() {
        let (processes, timeline) = sjf_tie_case();
        let calculator = MetricsCalculator::new();
        assert_eq!(calculator.average_waiting_time(&timeline, &processes).unwrap(), 1.5);
        assert_eq!(calculator.average_turnaround_time(&timeline, &processes).unwrap(), 5.5);
    }

    #[test]
    fn test_waiting_accumulates_over_preempted_blocks() {
        // P1 llega en 0 (ráfaga 4), P2 llega en 1 (ráfaga 3), quantum 2:
        // |_1_|_2_|_1_|_2_|
        // 0   2   4   6   7
        let processes = vec![Process::new(1, 0, 4), Process::new(2, 1, 3)];
        let mut timeline = Timeline::new(0);
        timeline.append_block(1, 2);
        timeline.append_block(2, 2);
        timeline.append_block(1, 2);
        timeline.append_block(2, 1);

        let metrics = MetricsCalculator::new()
            .calculate_all(&timeline, &processes)
            .unwrap();
        assert_eq!(metrics[0].waiting_time, 2);
        assert_eq!(metrics[0].turnaround_time, 6);
        assert_eq!(metrics[1].waiting_time, 1 + 2);
        assert_eq!(metrics[1].turnaround_time, 6);
        assert_eq!(metrics[1].completion_time, 7);
    }

    #[test]
    fn test_empty_process_set_is_precondition_violation() {
        let calculator = MetricsCalculator::new();
        let timeline = Timeline::new(0);
        assert!(matches!(
            calculator.average_waiting_time(&timeline, &[]),
            Err(SimError::PrecondViolation(_))
        ));
        assert!(matches!(
            calculator.average_turnaround_time(&timeline, &[]),
            Err(SimError::PrecondViolation(_))
        ));
        assert_eq!(
            calculator.summarize(&timeline, &[]).unwrap(),
            SimulationResult::default()
        );
    }

    #[test]
    fn test_process_without_blocks_is_rejected() {
        let timeline = Timeline::new(0);
        let processes = [Process::new(1, 0, 2)];
        let result = MetricsCalculator::new().average_turnaround_time(&timeline, &processes);
        assert!(result.is_err());
    }

    #[test]
    fn test_block_before_arrival_is_rejected() {
        let mut timeline = Timeline::new(0);
        timeline.append_block(1, 2);
        let result = MetricsCalculator::new().summarize(&timeline, &[Process::new(1, 5, 2)]);
        assert!(matches!(result, Err(SimError::PrecondViolation(_))));
    }

    #[test]
    fn test_gantt_marks_idle_blocks() {
        let mut timeline = Timeline::new(0);
        timeline.append_block(1, 2);
        timeline.append_block(IDLE_ID, 3);
        timeline.append_block(2, 1);
        let gantt = MetricsCalculator::format_gantt(&timeline);
        assert_eq!(gantt, "|_1_|_-_|_2_|\n0   2   5   6\n");
    }

    #[test]
    fn test_report_generation() {
        let (processes, timeline) = sjf_tie_case();
        let calculator = MetricsCalculator::new();

        let text = calculator.generate_report("SJF", &timeline, &processes).unwrap();
        assert!(text.contains("=== SJF ==="));
        assert!(text.contains("ESTADÍSTICAS RESUMIDAS"));
        assert!(text.contains("Tiempo promedio de espera: 1.500"));

        let csv = calculator.generate_csv_report(&timeline, &processes).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "2,0,3,0,3,3");
    }

    #[test]
    fn test_display_result() {
        let result = SimulationResult {
            average_waiting_time: 1.5,
            average_turnaround_time: 5.5,
        };
        assert_eq!(
            result.to_string(),
            "Tiempo promedio de retorno = 5.500000, Tiempo promedio de espera = 1.500000"
        );
    }
}
