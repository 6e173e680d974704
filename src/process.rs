//! # Módulo de Procesos
//!
//! Este módulo define los procesos que se planifican en la simulación y el
//! lector de tablas de procesos desde archivos de texto.
//!
//! El formato del archivo es:
//!
//! ```text
//! 10        <-- quantum
//! 1 4       <-- llegada 1, ráfaga 4   (proceso 1)
//! 3 7       <-- llegada 3, ráfaga 7   (proceso 2)
//! 2 8       <-- llegada 2, ráfaga 8   (proceso 3)
//! ```
//!
//! Los procesos no necesitan estar ordenados. El identificador de cada
//! proceso es su posición entre las líneas de procesos (1-indexado).

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::SimError;

/// Representa un proceso con su tiempo de llegada y de ráfaga.
///
/// Los procesos son inmutables una vez leídos; cada simulación trabaja
/// sobre una copia ordenada de referencias a ellos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Process {
    /// Identificador del proceso (1-indexado, orden del archivo)
    pub id: u32,
    /// Tick en el que el proceso llega a la cola de listos
    pub arrival_time: u64,
    /// Tiempo total de CPU que requiere el proceso
    pub burst_time: u64,
}

impl Process {
    /// Crea un nuevo proceso.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cpu_scheduling_simulator::Process;
    ///
    /// let process = Process::new(1, 0, 5);
    /// assert_eq!(process.burst_time, 5);
    /// ```
    pub fn new(id: u32, arrival_time: u64, burst_time: u64) -> Self {
        Self {
            id,
            arrival_time,
            burst_time,
        }
    }
}

/// Resultado de leer un archivo de procesos: quantum y lista de procesos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTable {
    /// Quantum para Round Robin (SJF lo ignora)
    pub quantum: u32,
    /// Procesos en el orden del archivo
    pub processes: Vec<Process>,
}

impl ProcessTable {
    /// Interpreta una tabla de procesos desde texto en memoria.
    ///
    /// # Errors
    ///
    /// `SimError::BadFormat` si falta el quantum o alguna línea de proceso
    /// no contiene exactamente dos enteros válidos.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cpu_scheduling_simulator::ProcessTable;
    ///
    /// let table = ProcessTable::parse("4\n0 5\n0 3\n").unwrap();
    /// assert_eq!(table.quantum, 4);
    /// assert_eq!(table.processes.len(), 2);
    /// assert_eq!(table.processes[1].id, 2);
    /// ```
    pub fn parse(text: &str) -> Result<Self, SimError> {
        parse_table(Path::new("<memoria>"), text)
    }
}

/// Lee una tabla de procesos desde un archivo.
///
/// # Errors
///
/// - `SimError::FileNotFound` si el archivo no se puede abrir
/// - `SimError::BadFormat` si el contenido no respeta el formato
pub fn read_processes(path: impl AsRef<Path>) -> Result<ProcessTable, SimError> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|_| SimError::FileNotFound {
        path: path.to_path_buf(),
    })?;

    let mut text = String::new();
    file.read_to_string(&mut text).map_err(|e| SimError::BadFormat {
        path: path.to_path_buf(),
        line: 0,
        reason: format!("no se pudo leer el contenido: {e}"),
    })?;

    parse_table(path, &text)
}

fn parse_table(path: &Path, text: &str) -> Result<ProcessTable, SimError> {
    let bad_format = |line: usize, reason: String| SimError::BadFormat {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let (quantum_line, quantum_text) = lines
        .next()
        .ok_or_else(|| bad_format(1, "falta el quantum".to_string()))?;

    let mut quantum_fields = quantum_text.split_whitespace();
    let quantum = match (quantum_fields.next(), quantum_fields.next()) {
        (Some(field), None) => field
            .parse::<u32>()
            .map_err(|_| bad_format(quantum_line, format!("quantum inválido: {field}")))?,
        _ => {
            return Err(bad_format(
                quantum_line,
                "la primera línea debe contener solo el quantum".to_string(),
            ))
        }
    };

    let mut processes = Vec::new();
    for (line_no, line) in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [arrival, burst] = fields.as_slice() else {
            return Err(bad_format(
                line_no,
                format!("se esperaban dos enteros, se encontraron {} campos", fields.len()),
            ));
        };

        let arrival_time = arrival
            .parse::<u64>()
            .map_err(|_| bad_format(line_no, format!("tiempo de llegada inválido: {arrival}")))?;
        let burst_time = burst
            .parse::<u64>()
            .map_err(|_| bad_format(line_no, format!("tiempo de ráfaga inválido: {burst}")))?;
        if burst_time == 0 {
            return Err(bad_format(line_no, "la ráfaga debe ser mayor que 0".to_string()));
        }

        let id = u32::try_from(processes.len() + 1)
            .map_err(|_| bad_format(line_no, "demasiados procesos".to_string()))?;
        processes.push(Process::new(id, arrival_time, burst_time));
    }

    Ok(ProcessTable { quantum, processes })
}

/// Colaborador que resuelve un nombre de entrada en una tabla de procesos.
///
/// Los workers del coordinador dependen de esta interfaz en lugar de leer
/// archivos directamente, lo que permite alimentarlos desde memoria.
pub trait ProcessSource: Send + Sync {
    fn read_processes(&self, name: &str) -> Result<ProcessTable, SimError>;
}

/// Fuente por defecto: interpreta el nombre como ruta, relativa a `base_dir`
/// si se configuró uno.
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    base_dir: Option<PathBuf>,
}

impl FileSource {
    /// Fuente que usa los nombres tal como llegan, relativos al directorio
    /// de trabajo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resuelve los nombres relativos dentro de `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }
}

impl ProcessSource for FileSource {
    fn read_processes(&self, name: &str) -> Result<ProcessTable, SimError> {
        match &self.base_dir {
            Some(dir) => read_processes(dir.join(name)),
            None => read_processes(name),
        }
    }
}
