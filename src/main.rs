use std::collections::VecDeque;
use std::io::{self, BufRead, StdinLock, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cpu_scheduling_simulator::{
    config, read_processes, run_table, run_table_with_report, Coordinator, FileSource, PolicyKind,
    SimError, SimulationResult,
};

/// Simulador de planificación de CPU (Round Robin y SJF).
#[derive(Parser, Debug)]
#[command(name = "cpu-scheduling-simulator", version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Option<Mode>,

    /// Imprime el diagrama de Gantt y la tabla de métricas de cada simulación
    #[arg(long, global = true)]
    gantt: bool,

    /// Nivel de log cuando RUST_LOG no está definido
    #[arg(long, env = "SIM_LOG_LEVEL", default_value = config::DEFAULT_LOG_LEVEL, global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Ambas políticas en paralelo, un worker por política (modo por defecto)
    Dual(Inputs),
    /// Solo Round Robin
    Rr(Inputs),
    /// Solo Shortest-Job-First
    Sjf(Inputs),
}

#[derive(Args, Debug, Default)]
struct Inputs {
    /// Archivos de procesos; sin archivos se leen nombres desde stdin hasta QUIT
    files: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let mode = cli.mode.unwrap_or(Mode::Dual(Inputs::default()));
    info!(?mode, gantt = cli.gantt, "iniciando simulador");

    match mode {
        Mode::Dual(inputs) => run_dual(EntrySource::new(inputs, config::DUAL_PROMPT), cli.gantt),
        Mode::Rr(inputs) => run_single(
            PolicyKind::RoundRobin,
            EntrySource::new(inputs, config::RR_PROMPT),
            cli.gantt,
        ),
        Mode::Sjf(inputs) => run_single(
            PolicyKind::ShortestJobFirst,
            EntrySource::new(inputs, config::SJF_PROMPT),
            cli.gantt,
        ),
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .init();
}

/// Cada entrada es una ronda para ambos workers.
fn run_dual(mut entries: EntrySource, gantt: bool) -> Result<()> {
    let source = Arc::new(FileSource::new());
    let coordinator = if gantt {
        Coordinator::with_reports(source)
    } else {
        Coordinator::with_source(source)
    }
    .context("no se pudieron lanzar los workers")?;

    while let Some(name) = entries.next_entry()? {
        let report = coordinator.run_round(&name)?;
        for kind in PolicyKind::ALL {
            print_outcome(kind, report.get(kind));
        }
        for kind in PolicyKind::ALL {
            if let Some(text) = report.report(kind) {
                println!("{text}");
            }
        }
    }

    coordinator.shutdown()?;
    Ok(())
}

/// Simula cada entrada con una sola política en el hilo principal.
fn run_single(kind: PolicyKind, mut entries: EntrySource, gantt: bool) -> Result<()> {
    while let Some(name) = entries.next_entry()? {
        let table = match read_processes(&name) {
            Ok(table) => table,
            Err(e) => {
                print_outcome(kind, &Err(e));
                continue;
            }
        };

        if gantt {
            match run_table_with_report(kind, &table) {
                Ok((result, report)) => {
                    print_outcome(kind, &Ok(result));
                    println!("{report}");
                }
                Err(e) => print_outcome(kind, &Err(e)),
            }
        } else {
            print_outcome(kind, &run_table(kind, &table));
        }
    }
    Ok(())
}

fn print_outcome(kind: PolicyKind, outcome: &Result<SimulationResult, SimError>) {
    match outcome {
        Ok(result) => println!("{kind}: {result}"),
        Err(e) => println!("{kind}: {e}"),
    }
}

/// Origen de los nombres de archivo: la lista de la línea de comandos o
/// stdin en modo interactivo.
enum EntrySource {
    Files(std::vec::IntoIter<String>),
    Interactive {
        prompt: &'static str,
        tokens: TokenReader<StdinLock<'static>>,
    },
}

impl EntrySource {
    fn new(inputs: Inputs, prompt: &'static str) -> Self {
        if inputs.files.is_empty() {
            Self::Interactive {
                prompt,
                tokens: TokenReader::new(io::stdin().lock()),
            }
        } else {
            Self::Files(inputs.files.into_iter())
        }
    }

    /// Próximo nombre a simular; `None` con el centinela o al fin de la entrada.
    fn next_entry(&mut self) -> Result<Option<String>> {
        match self {
            Self::Files(files) => Ok(files.next()),
            Self::Interactive { prompt, tokens } => {
                println!("{prompt}");
                io::stdout().flush().context("no se pudo escribir en stdout")?;

                let token = tokens.next_token().context("no se pudo leer stdin")?;
                Ok(token.filter(|token| !config::is_terminate(token)))
            }
        }
    }
}

/// Lector de palabras separadas por espacios, línea a línea.
struct TokenReader<R> {
    reader: R,
    pending: VecDeque<String>,
}

impl<R: BufRead> TokenReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
        }
    }

    fn next_token(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }

            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_string));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_tokens_span_lines_and_skip_blanks() {
        let mut tokens = TokenReader::new(Cursor::new("a.txt  b.txt\n\n   \nQUIT\n"));
        assert_eq!(tokens.next_token().unwrap(), Some("a.txt".to_string()));
        assert_eq!(tokens.next_token().unwrap(), Some("b.txt".to_string()));
        assert_eq!(tokens.next_token().unwrap(), Some("QUIT".to_string()));
        assert_eq!(tokens.next_token().unwrap(), None);
    }

    #[test]
    fn test_cli_defaults_to_dual_mode() {
        let cli = Cli::try_parse_from(["cpu-scheduling-simulator"]).unwrap();
        assert!(cli.mode.is_none());
        assert!(!cli.gantt);
    }

    #[test]
    fn test_cli_parses_files_and_flags() {
        let args = ["cpu-scheduling-simulator", "rr", "--gantt", "a.txt", "b.txt"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.gantt);
        match cli.mode {
            Some(Mode::Rr(inputs)) => assert_eq!(inputs.files, vec!["a.txt", "b.txt"]),
            other => panic!("modo inesperado: {other:?}"),
        }
    }

    #[test]
    fn test_file_entries_are_not_filtered() {
        let mut entries = EntrySource::new(
            Inputs {
                files: vec!["a.txt".to_string()],
            },
            config::DUAL_PROMPT,
        );
        assert_eq!(entries.next_entry().unwrap(), Some("a.txt".to_string()));
        assert_eq!(entries.next_entry().unwrap(), None);
    }
}
