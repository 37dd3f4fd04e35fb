/// RTSI package type byte, occupying the 4th byte of every frame (after the
/// 2-byte length and 1-byte type... the type *is* this byte; see
/// [`HEADER_SIZE`]). Values are the ASCII codes the protocol has used since
/// its first revision, kept as-is rather than renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackageType {
    RequestProtocolVersion,
    GetUrcontrolVersion,
    TextMessage,
    DataPackage,
    ControlPackageSetupOutputs,
    ControlPackageSetupInputs,
    ControlPackageStart,
    ControlPackagePause,
}

impl PackageType {
    pub const fn code(self) -> u8 {
        match self {
            Self::RequestProtocolVersion => 86,
            Self::GetUrcontrolVersion => 118,
            Self::TextMessage => 77,
            Self::DataPackage => 85,
            Self::ControlPackageSetupOutputs => 79,
            Self::ControlPackageSetupInputs => 73,
            Self::ControlPackageStart => 83,
            Self::ControlPackagePause => 80,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            86 => Self::RequestProtocolVersion,
            118 => Self::GetUrcontrolVersion,
            77 => Self::TextMessage,
            85 => Self::DataPackage,
            79 => Self::ControlPackageSetupOutputs,
            73 => Self::ControlPackageSetupInputs,
            83 => Self::ControlPackageStart,
            80 => Self::ControlPackagePause,
            _ => return None,
        })
    }
}

/// 2-byte big-endian length (whole frame, header included) + 1-byte type.
pub const HEADER_SIZE: usize = 3;

/// Serializes a complete RTSI frame: header followed by `payload`.
pub fn encode_frame(msg_type: PackageType, payload: &[u8]) -> Vec<u8> {
    let total_len = HEADER_SIZE + payload.len();
    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&(total_len as u16).to_be_bytes());
    out.push(msg_type.code());
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_header_and_payload() {
        let frame = encode_frame(PackageType::ControlPackageStart, &[1, 2, 3]);
        assert_eq!(frame, vec![0, 6, 83, 1, 2, 3]);
    }

    #[test]
    fn code_roundtrips() {
        for ty in [
            PackageType::RequestProtocolVersion,
            PackageType::GetUrcontrolVersion,
            PackageType::TextMessage,
            PackageType::DataPackage,
            PackageType::ControlPackageSetupOutputs,
            PackageType::ControlPackageSetupInputs,
            PackageType::ControlPackageStart,
            PackageType::ControlPackagePause,
        ] {
            assert_eq!(PackageType::from_code(ty.code()), Some(ty));
        }
        assert_eq!(PackageType::from_code(0), None);
    }
}
