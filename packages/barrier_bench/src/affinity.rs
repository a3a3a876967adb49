use core_affinity::CoreId;

use crate::Error;
use crate::error::Result;

/// Maps logical worker slots onto the system's logical cores.
///
/// The plan enumerates the cores available to the process once, orders them
/// by core id, and assigns slot `i` to the `i`-th core - cores filled left
/// to right. On the reference machine (one package, SMT pairs enumerated
/// after all physical cores) this places slots 0..4 on distinct physical
/// cores and slots 4..8 on their SMT siblings, which is the mapping the
/// tree layouts in `spin_barriers` are embedded against.
///
/// Workers pin themselves: each worker thread calls
/// [`pin_current_thread`](Self::pin_current_thread) with its own slot as the
/// first thing it does.
#[derive(Clone, Debug)]
pub struct PinningPlan {
    cores: Vec<CoreId>,
}

impl PinningPlan {
    /// Enumerates the cores available to this process and builds the
    /// slot-to-core mapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CoreEnumeration`] when the platform will not report
    /// its core set.
    pub fn detect() -> Result<Self> {
        let mut cores = core_affinity::get_core_ids().ok_or(Error::CoreEnumeration)?;

        // Enumeration order is platform-dependent; id order is the contract.
        cores.sort_by_key(|core| core.id);

        Ok(Self { cores })
    }

    /// How many logical slots this plan can pin.
    #[must_use]
    pub fn available(&self) -> usize {
        self.cores.len()
    }

    /// The core assigned to a logical slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SlotOutOfRange`] when the system has no core for
    /// `slot`.
    pub fn core_for_slot(&self, slot: usize) -> Result<CoreId> {
        self.cores
            .get(slot)
            .copied()
            .ok_or(Error::SlotOutOfRange {
                slot,
                available: self.cores.len(),
            })
    }

    /// Binds the calling thread to the core assigned to `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SlotOutOfRange`] for an unmapped slot and
    /// [`Error::PinFailed`] when the platform rejects the affinity request.
    /// Both are resource errors; the driver aborts the trial on either.
    pub fn pin_current_thread(&self, slot: usize) -> Result<()> {
        let core = self.core_for_slot(slot)?;

        if core_affinity::set_for_current(core) {
            Ok(())
        } else {
            Err(Error::PinFailed { slot })
        }
    }
}
