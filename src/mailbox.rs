//! # Módulo de Buzones
//!
//! Buzones de un solo lugar que comunican al despachador con los dos
//! workers. Cada buzón tiene su propio `Mutex` y variables de condición, y
//! toda espera vuelve a evaluar su predicado en un ciclo para tolerar
//! despertares espurios.
//!
//! - `RequestMailbox`: el despachador publica la entrada de la ronda; cada
//!   worker la copia y marca su bandera de "leído". El despachador no puede
//!   sobrescribir la entrada hasta que ambas banderas estén marcadas.
//! - `ResponseMailbox`: un worker publica su resultado solo cuando el dueño
//!   es "ninguno"; el despachador lo lee, vuelve el dueño a "ninguno" y
//!   libera el buzón para el otro worker.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::SimError;
use crate::metrics::SimulationResult;
use crate::scheduler::PolicyKind;

/// Entrada de una ronda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundMessage {
    /// Nombre del archivo de procesos a simular
    Resolve(String),
    /// Centinela de terminación: los workers salen sin responder
    Terminate,
}

/// Respuesta de un worker para una ronda.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResponse {
    /// Worker que produjo la respuesta
    pub origin: PolicyKind,
    /// Promedios de la simulación o el error al resolver la entrada
    pub outcome: Result<SimulationResult, SimError>,
    /// Reporte con el diagrama de Gantt, si el worker genera reportes
    pub report: Option<String>,
}

struct RequestSlot {
    message: Option<RoundMessage>,
    /// Indexado por `PolicyKind::index`
    consumed: [bool; 2],
}

/// Buzón de entrada compartido por el despachador y ambos workers.
pub struct RequestMailbox {
    slot: Mutex<RequestSlot>,
    /// Un aviso por worker: hay una entrada nueva sin leer
    posted: [Condvar; 2],
    /// Algún worker marcó su bandera de leído
    acked: Condvar,
}

impl RequestMailbox {
    /// Crea un buzón vacío; la primera publicación no espera a nadie.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(RequestSlot {
                message: None,
                consumed: [true, true],
            }),
            posted: [Condvar::new(), Condvar::new()],
            acked: Condvar::new(),
        }
    }

    /// Publica una nueva entrada (lado del despachador).
    ///
    /// Bloquea hasta que ambos workers hayan leído la entrada anterior.
    pub fn publish(&self, message: RoundMessage) {
        let mut slot = self.lock();
        while !slot.consumed.iter().all(|consumed| *consumed) {
            slot = self.acked.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }

        slot.message = Some(message);
        slot.consumed = [false, false];
        drop(slot);

        for posted in &self.posted {
            posted.notify_one();
        }
    }

    /// Toma la entrada vigente para el worker `origin` (lado del worker).
    ///
    /// Bloquea hasta que haya una entrada que este worker todavía no leyó.
    pub fn take(&self, origin: PolicyKind) -> RoundMessage {
        let idx = origin.index();
        let mut slot = self.lock();
        let message = loop {
            if !slot.consumed[idx] {
                if let Some(message) = slot.message.clone() {
                    break message;
                }
            }
            slot = self.posted[idx].wait(slot).unwrap_or_else(PoisonError::into_inner);
        };

        slot.consumed[idx] = true;
        drop(slot);
        self.acked.notify_one();

        message
    }

    /// `true` si ambos workers ya leyeron la última entrada.
    pub fn is_drained(&self) -> bool {
        self.lock().consumed.iter().all(|consumed| *consumed)
    }

    fn lock(&self) -> MutexGuard<'_, RequestSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RequestMailbox {
    fn default() -> Self {
        Self::new()
    }
}

struct ResponseSlot {
    /// Dueño actual del buzón; `None` significa libre
    owner: Option<PolicyKind>,
    response: Option<RoundResponse>,
}

/// Buzón de salida: un solo resultado a la vez, etiquetado con su dueño.
pub struct ResponseMailbox {
    slot: Mutex<ResponseSlot>,
    changed: Condvar,
}

impl ResponseMailbox {
    /// Crea un buzón libre.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(ResponseSlot {
                owner: None,
                response: None,
            }),
            changed: Condvar::new(),
        }
    }

    /// Publica la respuesta de un worker (lado del worker).
    ///
    /// Bloquea mientras el buzón tenga una respuesta sin leer, sea del otro
    /// worker o de una ronda anterior del mismo.
    pub fn post(&self, response: RoundResponse) {
        let mut slot = self.lock();
        while slot.owner.is_some() {
            slot = self.changed.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }

        slot.owner = Some(response.origin);
        slot.response = Some(response);
        drop(slot);
        self.changed.notify_all();
    }

    /// Lee la próxima respuesta y libera el buzón (lado del despachador).
    pub fn collect(&self) -> RoundResponse {
        let mut slot = self.lock();
        let response = loop {
            if slot.owner.is_some() {
                if let Some(response) = slot.response.take() {
                    break response;
                }
            }
            slot = self.changed.wait(slot).unwrap_or_else(PoisonError::into_inner);
        };

        slot.owner = None;
        drop(slot);
        self.changed.notify_all();

        response
    }

    fn lock(&self) -> MutexGuard<'_, ResponseSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ResponseMailbox {
    fn default() -> Self {
        Self::new()
    }
}
