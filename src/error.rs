//! # Módulo de Errores
//!
//! Taxonomía de errores del simulador. Los errores de archivo
//! (`FileNotFound`, `BadFormat`) se reportan como valores por ronda y nunca
//! detienen a un worker; `PrecondViolation` indica un contrato roto por el
//! llamador y aborta la operación en curso.

use std::path::PathBuf;

use thiserror::Error;

use crate::scheduler::PolicyKind;

/// Errores producidos por el simulador.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// No se pudo abrir el archivo de procesos.
    #[error("no se puede abrir el archivo: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// La tabla de procesos no respeta el formato esperado.
    #[error("formato inválido en {} (línea {line}): {reason}", path.display())]
    BadFormat {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Argumento inválido: quantum nulo, índice de bloque fuera de rango, etc.
    #[error("violación de precondición: {0}")]
    PrecondViolation(String),

    /// Un worker terminó con panic antes de poder unirse.
    #[error("el worker {origin} terminó de forma inesperada")]
    WorkerLost { origin: PolicyKind },
}

impl SimError {
    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Self::PrecondViolation(message.into())
    }

    /// `true` para errores recuperables de lectura de archivo.
    pub fn is_file_error(&self) -> bool {
        matches!(self, Self::FileNotFound { .. } | Self::BadFormat { .. })
    }
}
