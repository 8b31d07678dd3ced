//! Parameter storage contract
//!
//! The node serves `uavcan.protocol.param.GetSet` and `ExecuteOpcode` on top of a
//! [`ParamStorage`]. Persistence is entirely up to the implementation.

use heapless::Vec;

/// Longest string parameter value
pub const MAX_STRING_LENGTH: usize = 56;

pub type StringParam = Vec<u8, MAX_STRING_LENGTH>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamKind {
    Integer,
    String,
    Unknown,
}

/// Integer parameter snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IntegerParam {
    pub value: i32,
    pub default: i32,
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamError {
    UnknownIndex,
    /// The value is out of range or of a wrong kind
    InvalidValue,
    /// Non-volatile storage failure
    Storage,
}

/// Indexed parameter table
pub trait ParamStorage {
    /// Index of the parameter with the given name
    fn find(&self, name: &str) -> Option<u16>;

    fn name(&self, index: u16) -> Option<&str>;

    fn kind(&self, index: u16) -> ParamKind;

    fn integer(&self, index: u16) -> Option<IntegerParam>;

    fn set_integer(&mut self, index: u16, value: i32) -> Result<(), ParamError>;

    fn string(&self, index: u16) -> Option<StringParam>;

    fn set_string(&mut self, index: u16, value: &[u8]) -> Result<(), ParamError>;

    /// Writes all parameters to non-volatile storage
    fn save(&mut self) -> Result<(), ParamError>;

    /// Restores defaults in non-volatile storage
    fn reset_to_default(&mut self) -> Result<(), ParamError>;
}

/// Storage without parameters
#[derive(Debug, Default, Clone, Copy)]
pub struct NoParams;

impl ParamStorage for NoParams {
    fn find(&self, _name: &str) -> Option<u16> {
        None
    }

    fn name(&self, _index: u16) -> Option<&str> {
        None
    }

    fn kind(&self, _index: u16) -> ParamKind {
        ParamKind::Unknown
    }

    fn integer(&self, _index: u16) -> Option<IntegerParam> {
        None
    }

    fn set_integer(&mut self, _index: u16, _value: i32) -> Result<(), ParamError> {
        Err(ParamError::UnknownIndex)
    }

    fn string(&self, _index: u16) -> Option<StringParam> {
        None
    }

    fn set_string(&mut self, _index: u16, _value: &[u8]) -> Result<(), ParamError> {
        Err(ParamError::UnknownIndex)
    }

    fn save(&mut self) -> Result<(), ParamError> {
        Ok(())
    }

    fn reset_to_default(&mut self) -> Result<(), ParamError> {
        Ok(())
    }
}

impl<T: ParamStorage + ?Sized> ParamStorage for &mut T {
    fn find(&self, name: &str) -> Option<u16> {
        T::find(self, name)
    }

    fn name(&self, index: u16) -> Option<&str> {
        T::name(self, index)
    }

    fn kind(&self, index: u16) -> ParamKind {
        T::kind(self, index)
    }

    fn integer(&self, index: u16) -> Option<IntegerParam> {
        T::integer(self, index)
    }

    fn set_integer(&mut self, index: u16, value: i32) -> Result<(), ParamError> {
        T::set_integer(self, index, value)
    }

    fn string(&self, index: u16) -> Option<StringParam> {
        T::string(self, index)
    }

    fn set_string(&mut self, index: u16, value: &[u8]) -> Result<(), ParamError> {
        T::set_string(self, index, value)
    }

    fn save(&mut self) -> Result<(), ParamError> {
        T::save(self)
    }

    fn reset_to_default(&mut self) -> Result<(), ParamError> {
        T::reset_to_default(self)
    }
}
