//! A per-pool reentrancy guard (spec §5): every public, state-mutating
//! operation acquires it on entry and releases it on return, including on
//! an early error return via `Drop`. A call that observes the guard
//! already raised fails with `Error::Reentrancy` rather than blocking.

use common_errors::Error;

#[derive(Debug, Default)]
pub struct ReentrancyFlag(bool);

impl ReentrancyFlag {
    pub fn new() -> ReentrancyFlag {
        ReentrancyFlag(false)
    }

    pub fn acquire(&mut self) -> Result<ReentrancyGuard<'_>, Error> {
        if self.0 {
            return Err(Error::Reentrancy);
        }
        self.0 = true;
        Ok(ReentrancyGuard(&mut self.0))
    }
}

pub struct ReentrancyGuard<'a>(&'a mut bool);

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_while_held_fails() {
        let mut flag = ReentrancyFlag::new();
        let _guard = flag.acquire().unwrap();
        assert!(matches!(flag.acquire(), Err(Error::Reentrancy)));
    }

    #[test]
    fn guard_release_on_drop_allows_reacquire() {
        let mut flag = ReentrancyFlag::new();
        {
            let _guard = flag.acquire().unwrap();
        }
        assert!(flag.acquire().is_ok());
    }
}
