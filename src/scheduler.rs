//! # Módulo de Algoritmos de Planificación
//!
//! Este módulo define las políticas de scheduling disponibles (Round Robin
//! y Shortest-Job-First) y las funciones de orden que cada una usa para
//! admitir procesos y elegir el siguiente a ejecutar.

use std::cmp::Ordering;
use std::fmt;

use crate::error::SimError;
use crate::process::Process;

/// Identifica a qué política (y por lo tanto a qué worker) pertenece un
/// resultado.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    ShortestJobFirst,
    RoundRobin,
}

impl PolicyKind {
    /// Ambas políticas, en el orden en que se reportan.
    pub const ALL: [PolicyKind; 2] = [PolicyKind::ShortestJobFirst, PolicyKind::RoundRobin];

    /// Posición de la política en arreglos indexados por worker.
    pub(crate) fn index(self) -> usize {
        match self {
            Self::ShortestJobFirst => 0,
            Self::RoundRobin => 1,
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortestJobFirst => write!(f, "SJF"),
            Self::RoundRobin => write!(f, "RR"),
        }
    }
}

/// Algoritmos de planificación disponibles.
///
/// - SJF elige siempre el proceso listo con menor ráfaga y lo ejecuta hasta
///   terminar, aunque luego llegue uno más corto
/// - Round Robin reparte la CPU en turnos de a lo sumo `quantum` ticks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulingAlgorithm {
    /// Shortest-Job-First no preemptivo.
    ShortestJobFirst,

    /// Round Robin: procesamiento preemptivo con quantum fijo.
    ///
    /// Un proceso que agota su quantum sin terminar vuelve al final de la
    /// cola de listos.
    RoundRobin {
        /// Tiempo máximo de ejecución continua por turno (en ticks)
        quantum: u32,
    },
}

impl SchedulingAlgorithm {
    /// Crea un algoritmo SJF.
    pub fn sjf() -> Self {
        Self::ShortestJobFirst
    }

    /// Crea un algoritmo Round Robin con el quantum especificado.
    ///
    /// El quantum se valida al construir el motor, no aquí.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cpu_scheduling_simulator::SchedulingAlgorithm;
    ///
    /// let algorithm = SchedulingAlgorithm::round_robin(4);
    /// assert!(algorithm.is_preemptive());
    /// ```
    pub fn round_robin(quantum: u32) -> Self {
        Self::RoundRobin { quantum }
    }

    /// Algoritmo que corresponde a la política de un worker.
    ///
    /// # Arguments
    ///
    /// * `kind` - Política del worker
    /// * `quantum` - Quantum de la tabla de procesos (SJF lo ignora)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cpu_scheduling_simulator::{PolicyKind, SchedulingAlgorithm};
    ///
    /// assert_eq!(
    ///     SchedulingAlgorithm::for_kind(PolicyKind::RoundRobin, 4),
    ///     SchedulingAlgorithm::round_robin(4)
    /// );
    /// ```
    pub fn for_kind(kind: PolicyKind, quantum: u32) -> Self {
        match kind {
            PolicyKind::ShortestJobFirst => Self::sjf(),
            PolicyKind::RoundRobin => Self::round_robin(quantum),
        }
    }

    /// Determina si el algoritmo es preemptivo.
    pub fn is_preemptive(&self) -> bool {
        match self {
            Self::ShortestJobFirst => false,
            Self::RoundRobin { .. } => true,
        }
    }

    /// Verifica los parámetros del algoritmo.
    ///
    /// # Errors
    ///
    /// `SimError::PrecondViolation` si Round Robin tiene quantum 0.
    pub fn validate(&self) -> Result<(), SimError> {
        match self {
            Self::RoundRobin { quantum: 0 } => Err(SimError::precondition(
                "Round Robin requiere un quantum mayor que 0",
            )),
            _ => Ok(()),
        }
    }

    /// Calcula cuántos ticks puede ejecutar un proceso al ser despachado.
    ///
    /// # Arguments
    ///
    /// * `remaining` - Ráfaga restante del proceso
    ///
    /// # Returns
    ///
    /// La ráfaga completa para SJF, o `min(remaining, quantum)` para RR
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cpu_scheduling_simulator::SchedulingAlgorithm;
    ///
    /// assert_eq!(SchedulingAlgorithm::sjf().calculate_quantum(8), 8);
    /// assert_eq!(SchedulingAlgorithm::round_robin(3).calculate_quantum(8), 3);
    /// assert_eq!(SchedulingAlgorithm::round_robin(10).calculate_quantum(8), 8);
    /// ```
    pub fn calculate_quantum(&self, remaining: u64) -> u64 {
        match self {
            Self::ShortestJobFirst => remaining,
            Self::RoundRobin { quantum } => remaining.min(u64::from(*quantum)),
        }
    }

    /// Orden en que los procesos pendientes se admiten a la cola de listos.
    ///
    /// Round Robin ordena solo por llegada; SJF desempata las llegadas
    /// simultáneas por ráfaga. Usado con un ordenamiento estable, los
    /// empates restantes conservan el orden del archivo.
    pub fn admission_order(&self, a: &Process, b: &Process) -> Ordering {
        match self {
            Self::RoundRobin { .. } => by_arrival(a, b),
            Self::ShortestJobFirst => by_arrival(a, b).then_with(|| by_burst(a, b)),
        }
    }

    /// `true` si la cola de listos se reordena por ráfaga restante tras cada
    /// inserción.
    pub fn orders_ready_queue(&self) -> bool {
        matches!(self, Self::ShortestJobFirst)
    }

    /// Obtiene una descripción textual del algoritmo.
    pub fn description(&self) -> String {
        match self {
            Self::ShortestJobFirst => "Shortest-Job-First (no preemptivo)".to_string(),
            Self::RoundRobin { quantum } => {
                format!("Round Robin preemptivo (quantum: {quantum} ticks)")
            }
        }
    }
}

impl fmt::Display for SchedulingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortestJobFirst => write!(f, "SJF"),
            Self::RoundRobin { quantum } => write!(f, "Round Robin (quantum {quantum})"),
        }
    }
}

fn by_arrival(a: &Process, b: &Process) -> Ordering {
    a.arrival_time.cmp(&b.arrival_time)
}

fn by_burst(a: &Process, b: &Process) -> Ordering {
    a.burst_time.cmp(&b.burst_time)
}
