//! Process-wide engine registry
//!
//! At most one real-time chain exists per audio host: the engine handle
//! is acquired when the host initialises its driver and released on
//! drop. The chain itself stays an ordinary value (`MasteringChain`)
//! for hosts and tests that manage their own lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::chain::{ChainConfig, MasteringChain};
use crate::control::ControlHandle;
use crate::error::{ChainError, ChainResult};

static ENGINE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Owning handle for the process-wide chain instance
pub struct Engine {
    chain: MasteringChain,
}

impl Engine {
    /// Acquire the single chain instance for this process. Fails with
    /// `AlreadyActive` while another handle is alive, or `Unsupported`
    /// for a bad configuration.
    pub fn acquire(config: ChainConfig) -> ChainResult<(Engine, ControlHandle)> {
        if ENGINE_ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ChainError::AlreadyActive);
        }

        match MasteringChain::new(config) {
            Ok((chain, control)) => Ok((Engine { chain }, control)),
            Err(err) => {
                ENGINE_ACTIVE.store(false, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    /// The chain, for the audio callback
    #[inline]
    pub fn chain(&mut self) -> &mut MasteringChain {
        &mut self.chain
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        ENGINE_ACTIVE.store(false, Ordering::SeqCst);
    }
}
