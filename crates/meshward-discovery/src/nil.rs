//! Discoverer used when peer discovery is disabled

pub const NIL_DISCOVERY_NAME: &str = "no peer discovery";

#[derive(Debug, Default)]
pub struct NilDiscoverer;

impl NilDiscoverer {
    pub fn new() -> Self {
        Self
    }

    pub fn bootstrap(&self) -> Result<(), crate::DiscoveryError> {
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        NIL_DISCOVERY_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nil_discoverer() {
        let discoverer = NilDiscoverer::new();

        assert!(discoverer.bootstrap().is_ok());
        assert!(discoverer.bootstrap().is_ok());
        assert_eq!(discoverer.name(), NIL_DISCOVERY_NAME);
    }
}
