use metaprop_storage::Host;
use tracing::{debug, warn};

use crate::error::EngineError;

/// A transaction group made of isolated phases that outside observers see
/// as one change. Dropping an unfinalized batch rolls everything back.
pub struct Batch<'h, H: Host> {
    host: &'h mut H,
    phase_open: bool,
    finalized: bool,
}

impl<'h, H: Host> Batch<'h, H> {
    pub fn begin(host: &'h mut H, name: &str) -> Result<Self, EngineError> {
        host.begin_group(name)?;
        Ok(Self {
            host,
            phase_open: false,
            finalized: false,
        })
    }

    pub fn host(&mut self) -> &mut H {
        &mut *self.host
    }

    pub fn begin_phase(&mut self, name: &str) -> Result<(), EngineError> {
        if self.phase_open {
            return Err(EngineError::Integrity(format!(
                "phase {name:?} started while another phase is open"
            )));
        }
        self.host.begin_phase(name)?;
        self.phase_open = true;
        Ok(())
    }

    pub fn commit_phase(&mut self) -> Result<(), EngineError> {
        self.host.commit_phase()?;
        self.phase_open = false;
        Ok(())
    }

    pub fn rollback_phase(&mut self) -> Result<(), EngineError> {
        self.host.rollback_phase()?;
        self.phase_open = false;
        Ok(())
    }

    /// Run `f` as one phase: committed if it succeeds, rolled back if not.
    pub fn run_phase<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut H) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        self.begin_phase(name)?;
        match f(self.host()) {
            Ok(value) => {
                self.commit_phase()?;
                debug!(phase = name, "phase committed");
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.rollback_phase() {
                    warn!(phase = name, error = %rollback, "phase rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Merge all committed phases into a single undoable change.
    pub fn finalize(mut self) -> Result<(), EngineError> {
        if self.phase_open {
            return Err(EngineError::Integrity(
                "batch finalized with a phase still open".to_string(),
            ));
        }
        self.host.assimilate_group()?;
        self.finalized = true;
        Ok(())
    }
}

impl<H: Host> Drop for Batch<'_, H> {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        if self.phase_open {
            if let Err(e) = self.host.rollback_phase() {
                warn!(error = %e, "phase rollback failed");
            }
        }
        match self.host.rollback_group() {
            Ok(()) => debug!("unfinalized batch rolled back"),
            Err(e) => warn!(error = %e, "batch rollback failed"),
        }
    }
}
