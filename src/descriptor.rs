use std::fmt;
use std::str::FromStr;

use crate::constants::{FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS};
use crate::error::{DecodeError, RegisterError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCode {
    ReadHoldingRegisters,
    ReadInputRegisters,
}

impl FunctionCode {
    pub const fn code(self) -> u8 {
        match self {
            Self::ReadHoldingRegisters => FC_READ_HOLDING_REGISTERS,
            Self::ReadInputRegisters => FC_READ_INPUT_REGISTERS,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            FC_READ_HOLDING_REGISTERS => Some(Self::ReadHoldingRegisters),
            FC_READ_INPUT_REGISTERS => Some(Self::ReadInputRegisters),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Uint16,
    Int16,
    Uint32,
    Int32,
    Uint64,
    Int64,
    Float32,
    Float64,
}

impl DataType {
    pub const fn word_count(self) -> usize {
        match self {
            Self::Uint16 | Self::Int16 => 1,
            Self::Uint32 | Self::Int32 | Self::Float32 => 2,
            Self::Uint64 | Self::Int64 | Self::Float64 => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uint16 => "uint16",
            Self::Int16 => "int16",
            Self::Uint32 => "uint32",
            Self::Int32 => "int32",
            Self::Uint64 => "uint64",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data_type = match s.trim().to_ascii_lowercase().as_str() {
            "uint16" => Self::Uint16,
            "int16" => Self::Int16,
            "uint32" => Self::Uint32,
            "int32" => Self::Int32,
            "uint64" => Self::Uint64,
            "int64" => Self::Int64,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            _ => return Err(DecodeError::UnsupportedDataType(s.trim().to_owned())),
        };
        Ok(data_type)
    }
}

/// Word and byte ordering of a multi-register value.
///
/// Letters name the bytes of the big-endian value, so `ABCD` is the wire
/// order a big-endian device sends and `CDAB` has its words swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteFormat {
    #[default]
    Abcd,
    Cdab,
    Badc,
    Dcba,
    Ab,
    Ba,
}

impl ByteFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Abcd => "ABCD",
            Self::Cdab => "CDAB",
            Self::Badc => "BADC",
            Self::Dcba => "DCBA",
            Self::Ab => "AB",
            Self::Ba => "BA",
        }
    }
}

impl fmt::Display for ByteFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ByteFormat {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match s.trim().to_ascii_uppercase().as_str() {
            "ABCD" => Self::Abcd,
            "CDAB" => Self::Cdab,
            "BADC" => Self::Badc,
            "DCBA" => Self::Dcba,
            "AB" => Self::Ab,
            "BA" => Self::Ba,
            _ => return Err(DecodeError::UnsupportedByteFormat(s.trim().to_owned())),
        };
        Ok(format)
    }
}

/// One configured measurement point, validated at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterDescriptor {
    pub name: String,
    pub function: FunctionCode,
    pub address: u16,
    pub quantity: u16,
    pub data_type: DataType,
    pub scale: f64,
    pub byte_format: ByteFormat,
}

impl RegisterDescriptor {
    /// Parses `functionCode, address, quantity, dataType, scale[, byteFormat]`.
    pub fn parse(name: &str, line: &str) -> Result<Self, RegisterError> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if !(5..=6).contains(&fields.len()) {
            return Err(RegisterError::config(
                name,
                format!("expected 5 or 6 comma-separated fields, got {}", fields.len()),
            ));
        }

        let code: u8 = fields[0]
            .parse()
            .map_err(|_| RegisterError::UnsupportedFunctionCode {
                register: name.to_owned(),
                code: fields[0].to_owned(),
            })?;
        let function =
            FunctionCode::from_code(code).ok_or_else(|| RegisterError::UnsupportedFunctionCode {
                register: name.to_owned(),
                code: fields[0].to_owned(),
            })?;

        let address: u16 = fields[1]
            .parse()
            .map_err(|err| RegisterError::config(name, format!("invalid address {:?}: {err}", fields[1])))?;
        let quantity: u16 = fields[2].parse().map_err(|err| {
            RegisterError::config(name, format!("invalid quantity {:?}: {err}", fields[2]))
        })?;
        let data_type: DataType = fields[3]
            .parse()
            .map_err(|err| RegisterError::from_decode(name, err))?;
        let scale: f64 = fields[4]
            .parse()
            .map_err(|err| RegisterError::config(name, format!("invalid scale {:?}: {err}", fields[4])))?;
        let byte_format = match fields.get(5) {
            Some(field) if !field.is_empty() => field
                .parse()
                .map_err(|err| RegisterError::from_decode(name, err))?,
            _ => ByteFormat::default(),
        };

        if !scale.is_finite() {
            return Err(RegisterError::config(name, format!("scale must be finite, got {scale}")));
        }
        let needed = data_type.word_count();
        if usize::from(quantity) < needed {
            return Err(RegisterError::config(
                name,
                format!("{data_type} needs {needed} registers, quantity is {quantity}"),
            ));
        }
        if u32::from(address) + u32::from(quantity) > u32::from(u16::MAX) + 1 {
            return Err(RegisterError::config(
                name,
                format!("{quantity} registers from address {address} run past the register space"),
            ));
        }

        Ok(Self {
            name: name.to_owned(),
            function,
            address,
            quantity,
            data_type,
            scale,
            byte_format,
        })
    }

    /// Registers read beyond what the data type consumes.
    pub fn surplus_words(&self) -> usize {
        usize::from(self.quantity).saturating_sub(self.data_type.word_count())
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteFormat, DataType, FunctionCode, RegisterDescriptor};
    use crate::error::RegisterError;

    #[test]
    fn parses_full_line_with_whitespace() {
        let desc = RegisterDescriptor::parse("voltage", " 4 , 100, 2 , float32 , 0.1 , CDAB ")
            .expect("descriptor should parse");
        assert_eq!(desc.name, "voltage");
        assert_eq!(desc.function, FunctionCode::ReadInputRegisters);
        assert_eq!(desc.address, 100);
        assert_eq!(desc.quantity, 2);
        assert_eq!(desc.data_type, DataType::Float32);
        assert!((desc.scale - 0.1).abs() < f64::EPSILON);
        assert_eq!(desc.byte_format, ByteFormat::Cdab);
    }

    #[test]
    fn byte_format_defaults_to_abcd() {
        let desc = RegisterDescriptor::parse("count", "3, 0, 1, uint16, 1").expect("should parse");
        assert_eq!(desc.byte_format, ByteFormat::Abcd);

        let desc = RegisterDescriptor::parse("count", "3, 0, 1, uint16, 1,").expect("should parse");
        assert_eq!(desc.byte_format, ByteFormat::Abcd);
    }

    #[test]
    fn short_quantity_is_rejected_as_config_error() {
        let err = RegisterDescriptor::parse("energy", "3, 10, 1, uint32, 1")
            .expect_err("quantity 1 cannot hold a uint32");
        assert!(matches!(err, RegisterError::Config { ref register, .. } if register == "energy"));
    }

    #[test]
    fn surplus_quantity_is_accepted() {
        let desc = RegisterDescriptor::parse("status", "3, 10, 4, uint16, 1").expect("should parse");
        assert_eq!(desc.surplus_words(), 3);
    }

    #[test]
    fn unsupported_function_code_is_rejected() {
        let err = RegisterDescriptor::parse("setpoint", "6, 10, 1, uint16, 1")
            .expect_err("write function should be rejected");
        assert_eq!(
            err,
            RegisterError::UnsupportedFunctionCode {
                register: "setpoint".into(),
                code: "6".into(),
            }
        );
    }

    #[test]
    fn unknown_type_and_format_use_decode_taxonomy() {
        let err = RegisterDescriptor::parse("a", "3, 0, 2, uint24, 1").expect_err("bad type");
        assert!(matches!(err, RegisterError::UnsupportedDataType { .. }));

        let err = RegisterDescriptor::parse("b", "3, 0, 2, uint32, 1, DABC").expect_err("bad format");
        assert!(matches!(err, RegisterError::UnsupportedByteFormat { .. }));
    }

    #[test]
    fn malformed_fields_are_config_errors() {
        for line in [
            "3, 0, 1, uint16",
            "3, 0, 1, uint16, 1, ABCD, extra",
            "3, -1, 1, uint16, 1",
            "3, 0, x, uint16, 1",
            "3, 0, 1, uint16, fast",
            "3, 0, 1, uint16, inf",
            "3, 65534, 4, uint64, 1",
        ] {
            let err = RegisterDescriptor::parse("reg", line).expect_err(line);
            assert!(matches!(err, RegisterError::Config { .. }), "{line}: {err}");
        }
    }

    #[test]
    fn last_register_is_addressable() {
        let desc = RegisterDescriptor::parse("tail", "4, 65535, 1, int16, 1").expect("should parse");
        assert_eq!(desc.address, u16::MAX);
    }

    #[test]
    fn codes_parse_case_insensitively() {
        assert_eq!("dcba".parse::<ByteFormat>(), Ok(ByteFormat::Dcba));
        assert_eq!("Float64".parse::<DataType>(), Ok(DataType::Float64));
    }
}
