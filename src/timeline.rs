//! # Módulo de Línea de Tiempo (diagrama de Gantt)
//!
//! Un `Timeline` es una secuencia de bloques contiguos que registra qué
//! entidad ocupó la CPU en cada intervalo:
//!
//! ```text
//! |____1____|_2_|___3___|__2__|___3___|
//! 0         6   7       9    11      15
//! ```
//!
//! El tiempo final de un bloque es el instante *posterior* a su último tick;
//! el siguiente bloque comienza exactamente ahí.

use crate::error::SimError;

/// Identificador reservado para los intervalos en que la CPU está ociosa.
///
/// Los procesos se numeran desde 1, así que nunca coinciden con este valor.
pub const IDLE_ID: u32 = 0;

/// Intervalo contiguo de CPU asignado a una sola entidad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineBlock {
    /// Proceso que ocupó la CPU, o `IDLE_ID` si estuvo ociosa
    pub id: u32,
    pub start_time: u64,
    pub end_time: u64,
}

impl TimelineBlock {
    /// Duración del bloque en ticks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cpu_scheduling_simulator::TimelineBlock;
    ///
    /// let block = TimelineBlock { id: 1, start_time: 3, end_time: 8 };
    /// assert_eq!(block.duration(), 5);
    /// ```
    pub fn duration(&self) -> u64 {
        self.end_time - self.start_time
    }

    /// `true` si el bloque representa CPU ociosa.
    pub fn is_idle(&self) -> bool {
        self.id == IDLE_ID
    }
}

/// Diagrama de Gantt de solo inserción al final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    blocks: Vec<TimelineBlock>,
    origin: u64,
}

impl Timeline {
    /// Crea un diagrama vacío cuyo primer bloque empezará en `origin`.
    pub fn new(origin: u64) -> Self {
        Self {
            blocks: Vec::new(),
            origin,
        }
    }

    /// Agrega un bloque al final del diagrama.
    ///
    /// El bloque empieza donde terminó el anterior (o en el origen si el
    /// diagrama está vacío) y dura `duration` ticks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cpu_scheduling_simulator::Timeline;
    ///
    /// let mut timeline = Timeline::new(2);
    /// timeline.append_block(1, 3);
    /// let block = timeline.append_block(2, 4);
    /// assert_eq!((block.start_time, block.end_time), (5, 9));
    /// ```
    pub fn append_block(&mut self, id: u32, duration: u64) -> TimelineBlock {
        let start_time = self.end_time();
        let block = TimelineBlock {
            id,
            start_time,
            end_time: start_time + duration,
        };
        self.blocks.push(block);
        block
    }

    /// Tick en el que empieza el diagrama (la llegada más temprana).
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Fin del último bloque, o el origen si no hay bloques.
    pub fn end_time(&self) -> u64 {
        self.blocks.last().map_or(self.origin, |block| block.end_time)
    }

    /// Cantidad de bloques, contando los ociosos.
    ///
    /// # Returns
    ///
    /// El mayor `n` válido para [`block`](Self::block)
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Bloques en orden cronológico.
    pub fn blocks(&self) -> &[TimelineBlock] {
        &self.blocks
    }

    /// Obtiene el n-ésimo bloque del diagrama (1-indexado).
    ///
    /// # Errors
    ///
    /// `SimError::PrecondViolation` si `n` no está en `1..=block_count()`.
    pub fn block(&self, n: usize) -> Result<&TimelineBlock, SimError> {
        n.checked_sub(1)
            .and_then(|idx| self.blocks.get(idx))
            .ok_or_else(|| {
                SimError::precondition(format!(
                    "bloque {n} fuera de rango (1..={})",
                    self.blocks.len()
                ))
            })
    }

    /// Cantidad de bloques con el identificador dado.
    pub fn count_by_id(&self, id: u32) -> usize {
        self.blocks_for(id).count()
    }

    /// Obtiene el n-ésimo bloque (1-indexado, en orden de inserción) cuyo
    /// identificador es `id`.
    ///
    /// # Errors
    ///
    /// `SimError::PrecondViolation` si `n` no está en `1..=count_by_id(id)`.
    pub fn block_by_id(&self, id: u32, n: usize) -> Result<&TimelineBlock, SimError> {
        n.checked_sub(1)
            .and_then(|idx| self.blocks_for(id).nth(idx))
            .ok_or_else(|| {
                SimError::precondition(format!(
                    "bloque {n} del id {id} fuera de rango (1..={})",
                    self.count_by_id(id)
                ))
            })
    }

    /// Itera los bloques de un identificador en orden de inserción.
    pub fn blocks_for(&self, id: u32) -> impl Iterator<Item = &TimelineBlock> + '_ {
        self.blocks.iter().filter(move |block| block.id == id)
    }

    /// Tiempo de CPU efectivamente ejecutado (excluye los bloques ociosos).
    pub fn busy_time(&self) -> u64 {
        self.blocks
            .iter()
            .filter(|block| !block.is_idle())
            .map(TimelineBlock::duration)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Timeline {
        // |__1__|_2_|__3__|_2_|
        // 0     6   7     9   11
        let mut timeline = Timeline::new(0);
        timeline.append_block(1, 6);
        timeline.append_block(2, 1);
        timeline.append_block(3, 2);
        timeline.append_block(2, 2);
        timeline
    }

    #[test]
    fn test_empty_timeline_ends_at_origin() {
        let timeline = Timeline::new(7);
        assert!(timeline.is_empty());
        assert_eq!(timeline.end_time(), 7);
        assert_eq!(timeline.block_count(), 0);
    }

    #[test]
    fn test_first_block_starts_at_origin() {
        let mut timeline = Timeline::new(3);
        let block = timeline.append_block(1, 4);
        assert_eq!(block, TimelineBlock { id: 1, start_time: 3, end_time: 7 });
    }

    #[test]
    fn test_blocks_are_contiguous() {
        let timeline = sample();
        for pair in timeline.blocks().windows(2) {
            assert_eq!(pair[0].end_time, pair[1].start_time);
        }
        assert_eq!(timeline.end_time(), 11);
    }

    #[test]
    fn test_zero_length_block_is_legal() {
        let mut timeline = Timeline::new(0);
        timeline.append_block(1, 0);
        timeline.append_block(2, 3);
        assert_eq!(timeline.block(2).unwrap().start_time, 0);
    }

    #[test]
    fn test_block_is_one_indexed() {
        let timeline = sample();
        assert_eq!(timeline.block(1).unwrap().id, 1);
        assert_eq!(timeline.block(4).unwrap().id, 2);
        assert!(matches!(timeline.block(0), Err(SimError::PrecondViolation(_))));
        assert!(matches!(timeline.block(5), Err(SimError::PrecondViolation(_))));
    }

    #[test]
    fn test_query_by_id() {
        let timeline = sample();
        assert_eq!(timeline.count_by_id(2), 2);
        assert_eq!(timeline.count_by_id(9), 0);

        let second = timeline.block_by_id(2, 2).unwrap();
        assert_eq!((second.start_time, second.end_time), (9, 11));
        assert!(timeline.block_by_id(2, 3).is_err());
        assert!(timeline.block_by_id(2, 0).is_err());
        assert!(timeline.block_by_id(9, 1).is_err());
    }

    #[test]
    fn test_busy_time_skips_idle_blocks() {
        let mut timeline = Timeline::new(0);
        timeline.append_block(1, 2);
        timeline.append_block(IDLE_ID, 5);
        timeline.append_block(2, 3);
        assert_eq!(timeline.busy_time(), 5);
        assert_eq!(timeline.end_time(), 10);
    }
}
