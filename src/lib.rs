//! # Simulador de Planificación de CPU
//!
//! Esta biblioteca simula dos políticas de planificación de CPU sobre una
//! tabla de procesos leída desde un archivo de texto, y calcula el tiempo
//! promedio de espera y de retorno de cada una.
//!
//! ## Características principales
//!
//! - **Algoritmos de scheduling**: Round Robin preemptivo con quantum
//!   configurable y Shortest-Job-First no preemptivo.
//! - **Línea de tiempo**: cada simulación produce un diagrama de Gantt con
//!   los bloques de ejecución (y de CPU ociosa) en orden cronológico.
//! - **Doble canal**: un worker persistente por política recibe el mismo
//!   archivo en cada ronda mediante buzones protegidos con `Mutex` y
//!   `Condvar`, y el despachador recolecta una respuesta de cada uno.
//!
//! ## Estructura del proyecto
//!
//! - `process`: procesos y lector de tablas de procesos
//! - `timeline`: línea de tiempo (diagrama de Gantt) de una simulación
//! - `metrics`: cálculo de tiempos de espera y retorno, y reportes
//! - `scheduler`: definición de las políticas de planificación
//! - `engine`: motor de simulación por ticks
//! - `mailbox`: buzones de solicitud y respuesta entre hilos
//! - `coordinator`: despachador y workers del doble canal
//! - `error`: errores del simulador

pub mod coordinator;
pub mod engine;
pub mod error;
pub mod mailbox;
pub mod metrics;
pub mod process;
pub mod scheduler;
pub mod timeline;

// Re-exportar las estructuras principales para facilitar su uso
pub use coordinator::{Coordinator, RoundReport};
pub use engine::{run_rr, run_sjf, run_table, run_table_with_report, Engine};
pub use error::SimError;
pub use mailbox::{RoundMessage, RoundResponse};
pub use metrics::{MetricsCalculator, ProcessMetrics, SimulationResult};
pub use process::{read_processes, FileSource, Process, ProcessSource, ProcessTable};
pub use scheduler::{PolicyKind, SchedulingAlgorithm};
pub use timeline::{Timeline, TimelineBlock, IDLE_ID};

/// Configuración por defecto del simulador
pub mod config {
    /// Entrada que termina el ciclo interactivo y a los workers
    pub const TERMINATE_TOKEN: &str = "QUIT";

    /// Identificador reservado para los bloques de CPU ociosa
    pub const IDLE_ID: u32 = super::timeline::IDLE_ID;

    /// Mensaje mostrado antes de cada entrada en modo doble canal
    pub const DUAL_PROMPT: &str = "Scheduling simulation:";

    /// Mensaje mostrado antes de cada entrada en modo solo Round Robin
    pub const RR_PROMPT: &str = "RR simulation:";

    /// Mensaje mostrado antes de cada entrada en modo solo SJF
    pub const SJF_PROMPT: &str = "SJF simulation:";

    /// Nivel de log cuando no se define `RUST_LOG` ni `--log-level`
    pub const DEFAULT_LOG_LEVEL: &str = "warn";

    /// `true` si la entrada es el centinela de terminación.
    pub fn is_terminate(token: &str) -> bool {
        token == TERMINATE_TOKEN
    }
}
