//! # Módulo del Coordinador de Doble Canal
//!
//! Este módulo lanza un worker persistente por política (SJF y Round Robin)
//! y ofrece al hilo llamador, que actúa como despachador, la API por rondas:
//! cada ronda entrega el mismo nombre de archivo a ambos workers y recolecta
//! exactamente una respuesta de cada uno.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{debug, error, info, warn};

use crate::engine::{run_table, run_table_with_report};
use crate::error::SimError;
use crate::mailbox::{RequestMailbox, ResponseMailbox, RoundMessage, RoundResponse};
use crate::metrics::SimulationResult;
use crate::process::{FileSource, ProcessSource};
use crate::scheduler::PolicyKind;

/// Resultados de una ronda, ya emparejados por worker.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub sjf: Result<SimulationResult, SimError>,
    pub rr: Result<SimulationResult, SimError>,
    /// Reporte de SJF, solo si el coordinador genera reportes
    pub sjf_report: Option<String>,
    /// Reporte de Round Robin, solo si el coordinador genera reportes
    pub rr_report: Option<String>,
}

impl RoundReport {
    /// Resultado del worker de la política dada.
    pub fn get(&self, kind: PolicyKind) -> &Result<SimulationResult, SimError> {
        match kind {
            PolicyKind::ShortestJobFirst => &self.sjf,
            PolicyKind::RoundRobin => &self.rr,
        }
    }

    /// Reporte con el diagrama de Gantt del worker de la política dada.
    pub fn report(&self, kind: PolicyKind) -> Option<&str> {
        match kind {
            PolicyKind::ShortestJobFirst => self.sjf_report.as_deref(),
            PolicyKind::RoundRobin => self.rr_report.as_deref(),
        }
    }
}

/// Orquestador de los dos workers de simulación.
///
/// El `Coordinator` es el despachador: publica cada entrada en el buzón de
/// solicitudes y recolecta las respuestas del buzón de respuestas. Está
/// pensado para un único hilo despachador. No modela tiempos de espera: un
/// worker que no responde bloquea al despachador indefinidamente.
pub struct Coordinator {
    requests: Arc<RequestMailbox>,
    responses: Arc<ResponseMailbox>,
    workers: Vec<WorkerHandle>,
    /// Respuestas retiradas del buzón mientras `submit` esperaba a un worker
    backlog: Mutex<VecDeque<RoundResponse>>,
    /// Respuestas de rondas enviadas que el llamador aún no recolectó
    outstanding: AtomicUsize,
    rounds: AtomicUsize,
    terminated: AtomicBool,
}

impl Coordinator {
    /// Lanza ambos workers leyendo los procesos desde archivos.
    ///
    /// # Errors
    ///
    /// Devuelve el error del sistema operativo si no se pudo crear algún hilo.
    pub fn spawn() -> io::Result<Self> {
        Self::with_source(Arc::new(FileSource::new()))
    }

    /// Lanza ambos workers con una fuente de procesos personalizada.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use cpu_scheduling_simulator::{Coordinator, FileSource};
    ///
    /// let source = Arc::new(FileSource::with_base_dir("datos"));
    /// let coordinator = Coordinator::with_source(source).unwrap();
    /// let report = coordinator.run_round("procesos.txt").unwrap();
    /// println!("SJF: {:?}", report.sjf);
    /// println!("RR: {:?}", report.rr);
    /// coordinator.shutdown().unwrap();
    /// ```
    pub fn with_source(source: Arc<dyn ProcessSource>) -> io::Result<Self> {
        Self::start(source, false)
    }

    /// Como [`with_source`](Self::with_source), pero cada worker adjunta a su
    /// respuesta el reporte con el diagrama de Gantt de la misma simulación.
    pub fn with_reports(source: Arc<dyn ProcessSource>) -> io::Result<Self> {
        Self::start(source, true)
    }

    fn start(source: Arc<dyn ProcessSource>, reports: bool) -> io::Result<Self> {
        let requests = Arc::new(RequestMailbox::new());
        let responses = Arc::new(ResponseMailbox::new());

        let mut workers: Vec<WorkerHandle> = Vec::with_capacity(PolicyKind::ALL.len());
        for origin in PolicyKind::ALL {
            let worker = Worker {
                origin,
                reports,
                requests: Arc::clone(&requests),
                responses: Arc::clone(&responses),
                source: Arc::clone(&source),
            };

            let spawned = thread::Builder::new()
                .name(format!("{}-worker", origin.to_string().to_lowercase()))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => workers.push(WorkerHandle { origin, handle }),
                Err(e) => {
                    warn!(worker = %origin, error = %e, "no se pudo crear el worker");
                    // Los workers ya lanzados reciben el centinela y se unen
                    requests.publish(RoundMessage::Terminate);
                    for started in workers {
                        let _ = started.handle.join();
                    }
                    return Err(e);
                }
            }
        }

        info!(reports, "coordinador iniciado con {} workers", workers.len());

        Ok(Self {
            requests,
            responses,
            workers,
            backlog: Mutex::new(VecDeque::new()),
            outstanding: AtomicUsize::new(0),
            rounds: AtomicUsize::new(0),
            terminated: AtomicBool::new(false),
        })
    }

    /// Entrega una entrada a ambos workers.
    ///
    /// Mientras algún worker no haya leído la entrada anterior, las
    /// respuestas que vayan llegando se guardan en una cola interna para
    /// liberar el buzón de respuestas; así un worker bloqueado publicando
    /// puede avanzar y leer. Tras una entrada `Resolve` deben recolectarse
    /// dos respuestas con [`collect`](Self::collect); tras `Terminate` no
    /// llega ninguna.
    ///
    /// # Errors
    ///
    /// `SimError::PrecondViolation` si el coordinador ya fue terminado.
    pub fn submit(&self, message: RoundMessage) -> Result<(), SimError> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(SimError::precondition(
                "el coordinador ya recibió el centinela de terminación",
            ));
        }

        // La entrada pendiente es un `Resolve`, así que su respuesta llegará
        while !self.requests.is_drained() {
            let response = self.responses.collect();
            debug!(worker = %response.origin, "respuesta guardada a la espera de un worker");
            self.lock_backlog().push_back(response);
        }

        match &message {
            RoundMessage::Resolve(name) => {
                let round = self.rounds.fetch_add(1, Ordering::SeqCst) + 1;
                self.outstanding
                    .fetch_add(PolicyKind::ALL.len(), Ordering::SeqCst);
                info!(round, file = %name, "enviando ronda a los workers");
            }
            RoundMessage::Terminate => {
                self.terminated.store(true, Ordering::SeqCst);
                info!("enviando centinela de terminación");
            }
        }

        self.requests.publish(message);
        Ok(())
    }

    /// Recolecta la próxima respuesta de cualquiera de los workers.
    ///
    /// Las respuestas no llegan en un orden fijo entre workers, pero las de
    /// un mismo worker respetan el orden de las rondas; el campo `origin`
    /// indica qué worker la produjo.
    ///
    /// # Errors
    ///
    /// `SimError::PrecondViolation` si no hay respuestas pendientes, lo que
    /// de otro modo bloquearía para siempre.
    pub fn collect(&self) -> Result<RoundResponse, SimError> {
        self.outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map_err(|_| SimError::precondition("no hay respuestas pendientes de recolectar"))?;

        let buffered = self.lock_backlog().pop_front();
        let response = match buffered {
            Some(response) => response,
            None => self.responses.collect(),
        };
        debug!(worker = %response.origin, ok = response.outcome.is_ok(), "respuesta recibida");
        Ok(response)
    }

    /// Ejecuta una ronda completa: envía `name` y espera ambas respuestas.
    ///
    /// # Errors
    ///
    /// `SimError::PrecondViolation` si quedan respuestas de rondas anteriores
    /// sin recolectar o si el coordinador ya fue terminado. Los errores de
    /// archivo no hacen fallar la ronda: viajan dentro del `RoundReport`.
    pub fn run_round(&self, name: &str) -> Result<RoundReport, SimError> {
        if self.pending_responses() > 0 {
            return Err(SimError::precondition(
                "hay respuestas de rondas anteriores sin recolectar",
            ));
        }

        self.submit(RoundMessage::Resolve(name.to_string()))?;

        let mut sjf = None;
        let mut rr = None;
        for _ in 0..PolicyKind::ALL.len() {
            let response = self.collect()?;
            let entry = (response.outcome, response.report);
            match response.origin {
                PolicyKind::ShortestJobFirst => sjf = Some(entry),
                PolicyKind::RoundRobin => rr = Some(entry),
            }
        }

        match (sjf, rr) {
            (Some((sjf, sjf_report)), Some((rr, rr_report))) => Ok(RoundReport {
                sjf,
                rr,
                sjf_report,
                rr_report,
            }),
            _ => Err(SimError::precondition(
                "un worker respondió dos veces en la misma ronda",
            )),
        }
    }

    /// Respuestas que aún faltan recolectar.
    pub fn pending_responses(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Cantidad de rondas enviadas.
    pub fn rounds_submitted(&self) -> usize {
        self.rounds.load(Ordering::SeqCst)
    }

    /// Envía el centinela (si no se envió) y espera a que ambos workers
    /// terminen.
    ///
    /// Las respuestas pendientes se descartan antes de enviar el centinela,
    /// ya que un worker bloqueado publicando no podría leerlo.
    ///
    /// # Errors
    ///
    /// `SimError::WorkerLost` si algún worker terminó con panic.
    pub fn shutdown(mut self) -> Result<(), SimError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), SimError> {
        while self.pending_responses() > 0 {
            let response = self.collect()?;
            debug!(worker = %response.origin, "respuesta descartada al detener");
        }

        if !self.terminated.load(Ordering::SeqCst) {
            self.submit(RoundMessage::Terminate)?;
        }

        let mut result = Ok(());
        for worker in self.workers.drain(..) {
            if worker.handle.join().is_err() {
                warn!(worker = %worker.origin, "el worker terminó con panic");
                result = Err(SimError::WorkerLost {
                    origin: worker.origin,
                });
            }
        }

        info!(rounds = self.rounds_submitted(), "coordinador detenido");
        result
    }

    fn lock_backlog(&self) -> MutexGuard<'_, VecDeque<RoundResponse>> {
        self.backlog.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        if let Err(e) = self.stop() {
            warn!(error = %e, "error al detener el coordinador");
        }
    }
}

/// Handle para unir un worker al terminar.
struct WorkerHandle {
    origin: PolicyKind,
    handle: thread::JoinHandle<()>,
}

/// Worker ligado a una política; vive hasta recibir el centinela.
struct Worker {
    origin: PolicyKind,
    reports: bool,
    requests: Arc<RequestMailbox>,
    responses: Arc<ResponseMailbox>,
    source: Arc<dyn ProcessSource>,
}

impl Worker {
    fn run(self) {
        info!(worker = %self.origin, "worker iniciado");

        loop {
            let name = match self.requests.take(self.origin) {
                RoundMessage::Terminate => break,
                RoundMessage::Resolve(name) => name,
            };

            // La simulación corre fuera de cualquier sección crítica
            let (outcome, report) = match self.simulate(&name) {
                Ok((result, report)) => (Ok(result), report),
                Err(e) => (Err(e), None),
            };

            match &outcome {
                Ok(result) => debug!(
                    worker = %self.origin,
                    file = %name,
                    wait = result.average_waiting_time,
                    turnaround = result.average_turnaround_time,
                    "simulación completada"
                ),
                Err(e) if e.is_file_error() => warn!(
                    worker = %self.origin,
                    file = %name,
                    error = %e,
                    "no se pudo leer la entrada"
                ),
                Err(e) => error!(
                    worker = %self.origin,
                    file = %name,
                    error = %e,
                    "entrada inválida"
                ),
            }

            self.responses.post(RoundResponse {
                origin: self.origin,
                outcome,
                report,
            });
        }

        info!(worker = %self.origin, "worker finalizado");
    }

    fn simulate(&self, name: &str) -> Result<(SimulationResult, Option<String>), SimError> {
        let table = self.source.read_processes(name)?;
        if self.reports {
            run_table_with_report(self.origin, &table)
                .map(|(result, report)| (result, Some(report)))
        } else {
            run_table(self.origin, &table).map(|result| (result, None))
        }
    }
}
