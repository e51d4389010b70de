//! Target address location
//!
//! How an address is found (signature scan, symbol table, hardcoded offset)
//! is the embedder's business. The core only asks for a name and accepts an
//! address or a failure.

use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr::NonNull;

use crate::error::EnvironmentError;

/// Resolves a stable target name to a raw code address
pub trait TargetLocator: Send + Sync {
    /// Locate the target, or report why it could not be found
    fn locate(&self, name: &str) -> Result<NonNull<c_void>, EnvironmentError>;
}

/// Locator backed by a fixed table of addresses
#[derive(Debug, Default, Clone)]
pub struct AddressTable {
    addresses: HashMap<String, usize>,
}

impl AddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address, builder style
    pub fn with(mut self, name: &str, address: *const ()) -> Self {
        self.insert(name, address);
        self
    }

    /// Add or replace an address
    pub fn insert(&mut self, name: &str, address: *const ()) {
        self.addresses.insert(name.to_string(), address as usize);
    }

    /// Number of known targets
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl TargetLocator for AddressTable {
    fn locate(&self, name: &str) -> Result<NonNull<c_void>, EnvironmentError> {
        let address = self
            .addresses
            .get(name)
            .copied()
            .ok_or_else(|| EnvironmentError::TargetNotFound(name.to_string()))?;

        NonNull::new(address as *mut c_void)
            .ok_or_else(|| EnvironmentError::NullPointer(name.to_string()))
    }
}

/// Locator wrapping a lookup closure (signature scanner, symbol lookup)
pub struct FnLocator<F> {
    lookup: F,
}

impl<F> FnLocator<F>
where
    F: Fn(&str) -> Option<*const ()> + Send + Sync,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }
}

impl<F> TargetLocator for FnLocator<F>
where
    F: Fn(&str) -> Option<*const ()> + Send + Sync,
{
    fn locate(&self, name: &str) -> Result<NonNull<c_void>, EnvironmentError> {
        let address = (self.lookup)(name)
            .ok_or_else(|| EnvironmentError::TargetNotFound(name.to_string()))?;

        NonNull::new(address as *mut c_void)
            .ok_or_else(|| EnvironmentError::NullPointer(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_table_lookup() {
        let table = AddressTable::new()
            .with("GetLocalPlayerIndex", 0x1000 as *const ())
            .with("Null", std::ptr::null());

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.locate("GetLocalPlayerIndex").unwrap().as_ptr() as usize,
            0x1000
        );
        assert!(matches!(
            table.locate("Null"),
            Err(EnvironmentError::NullPointer(_))
        ));
        assert!(matches!(
            table.locate("Missing"),
            Err(EnvironmentError::TargetNotFound(_))
        ));
    }

    #[test]
    fn test_fn_locator() {
        let locator = FnLocator::new(|name| {
            if name == "SetMode" {
                Some(0x2000 as *const ())
            } else {
                None
            }
        });

        assert_eq!(locator.locate("SetMode").unwrap().as_ptr() as usize, 0x2000);
        assert!(locator.locate("SetCameraAngle").is_err());
    }
}
