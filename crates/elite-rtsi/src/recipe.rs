use elite_utils::DriverError;

/// Wire element types the controller's recipe negotiation can report back
/// for a requested variable name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Bool,
    Uint8,
    Int8,
    Uint16,
    Int16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Double,
    Vector3D,
    Vector6D,
    Vector6Int32,
    Vector6Uint32,
}

impl ElementType {
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "BOOL" => Self::Bool,
            "UINT8" => Self::Uint8,
            "INT8" => Self::Int8,
            "UINT16" => Self::Uint16,
            "INT16" => Self::Int16,
            "INT32" => Self::Int32,
            "UINT32" => Self::Uint32,
            "INT64" => Self::Int64,
            "UINT64" => Self::Uint64,
            "DOUBLE" => Self::Double,
            "VECTOR3D" => Self::Vector3D,
            "VECTOR6D" => Self::Vector6D,
            "VECTOR6INT32" => Self::Vector6Int32,
            "VECTOR6UINT32" => Self::Vector6Uint32,
            _ => return None,
        })
    }

    pub const fn wire_size(self) -> usize {
        match self {
            Self::Bool | Self::Uint8 | Self::Int8 => 1,
            Self::Uint16 | Self::Int16 => 2,
            Self::Int32 | Self::Uint32 => 4,
            Self::Int64 | Self::Uint64 | Self::Double => 8,
            Self::Vector3D => 8 * 3,
            Self::Vector6D => 8 * 6,
            Self::Vector6Int32 | Self::Vector6Uint32 => 4 * 6,
        }
    }
}

/// A decoded (or to-be-encoded) recipe element value.
#[derive(Clone, Debug, PartialEq)]
pub enum RecipeValue {
    Bool(bool),
    Uint8(u8),
    Int8(i8),
    Uint16(u16),
    Int16(i16),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Double(f64),
    Vector3D([f64; 3]),
    Vector6D([f64; 6]),
    Vector6Int32([i32; 6]),
    Vector6Uint32([u32; 6]),
}

impl RecipeValue {
    /// Best-effort narrowing used by the named getters in
    /// [`crate::io_interface`]: returns the default for the target shape
    /// when the cached value is absent or of a different type, rather than
    /// failing the getter outright.
    pub fn as_f64(value: Option<&Self>) -> f64 {
        match value {
            Some(Self::Double(v)) => *v,
            _ => 0.0,
        }
    }

    pub fn as_vector3d(value: Option<&Self>) -> [f64; 3] {
        match value {
            Some(Self::Vector3D(v)) => *v,
            _ => [0.0; 3],
        }
    }

    pub fn as_vector6d(value: Option<&Self>) -> [f64; 6] {
        match value {
            Some(Self::Vector6D(v)) => *v,
            _ => [0.0; 6],
        }
    }

    pub fn as_vector6i32(value: Option<&Self>) -> [i32; 6] {
        match value {
            Some(Self::Vector6Int32(v)) => *v,
            _ => [0; 6],
        }
    }

    pub fn as_u32(value: Option<&Self>) -> u32 {
        match value {
            Some(Self::Uint32(v)) => *v,
            _ => 0,
        }
    }

    pub fn as_i32(value: Option<&Self>) -> i32 {
        match value {
            Some(Self::Int32(v)) => *v,
            _ => 0,
        }
    }

    pub fn as_u8(value: Option<&Self>) -> u8 {
        match value {
            Some(Self::Uint8(v)) => *v,
            _ => 0,
        }
    }

    pub fn as_bool(value: Option<&Self>) -> bool {
        match value {
            Some(Self::Bool(v)) => *v,
            _ => false,
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Bool(_) => ElementType::Bool,
            Self::Uint8(_) => ElementType::Uint8,
            Self::Int8(_) => ElementType::Int8,
            Self::Uint16(_) => ElementType::Uint16,
            Self::Int16(_) => ElementType::Int16,
            Self::Int32(_) => ElementType::Int32,
            Self::Uint32(_) => ElementType::Uint32,
            Self::Int64(_) => ElementType::Int64,
            Self::Uint64(_) => ElementType::Uint64,
            Self::Double(_) => ElementType::Double,
            Self::Vector3D(_) => ElementType::Vector3D,
            Self::Vector6D(_) => ElementType::Vector6D,
            Self::Vector6Int32(_) => ElementType::Vector6Int32,
            Self::Vector6Uint32(_) => ElementType::Vector6Uint32,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::Bool(v) => out.push(u8::from(*v)),
            Self::Uint8(v) => out.push(*v),
            Self::Int8(v) => out.push(v.to_be_bytes()[0]),
            Self::Uint16(v) => out.extend_from_slice(&v.to_be_bytes()),
            Self::Int16(v) => out.extend_from_slice(&v.to_be_bytes()),
            Self::Int32(v) => out.extend_from_slice(&v.to_be_bytes()),
            Self::Uint32(v) => out.extend_from_slice(&v.to_be_bytes()),
            Self::Int64(v) => out.extend_from_slice(&v.to_be_bytes()),
            Self::Uint64(v) => out.extend_from_slice(&v.to_be_bytes()),
            Self::Double(v) => out.extend_from_slice(&v.to_be_bytes()),
            Self::Vector3D(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_be_bytes())),
            Self::Vector6D(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_be_bytes())),
            Self::Vector6Int32(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_be_bytes())),
            Self::Vector6Uint32(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_be_bytes())),
        }
    }

    /// Decodes one value of `ty` from the front of `buf`, advancing it past
    /// the consumed bytes.
    pub fn decode(ty: ElementType, buf: &mut &[u8]) -> Result<Self, DriverError> {
        if buf.len() < ty.wire_size() {
            return Err(DriverError::RtsiRecipeParseFail(format!("buffer too short for {ty:?}: need {}, have {}", ty.wire_size(), buf.len())));
        }
        let value = match ty {
            ElementType::Bool => Self::Bool(buf[0] != 0),
            ElementType::Uint8 => Self::Uint8(buf[0]),
            ElementType::Int8 => Self::Int8(buf[0] as i8),
            ElementType::Uint16 => Self::Uint16(u16::from_be_bytes(buf[..2].try_into().unwrap())),
            ElementType::Int16 => Self::Int16(i16::from_be_bytes(buf[..2].try_into().unwrap())),
            ElementType::Int32 => Self::Int32(i32::from_be_bytes(buf[..4].try_into().unwrap())),
            ElementType::Uint32 => Self::Uint32(u32::from_be_bytes(buf[..4].try_into().unwrap())),
            ElementType::Int64 => Self::Int64(i64::from_be_bytes(buf[..8].try_into().unwrap())),
            ElementType::Uint64 => Self::Uint64(u64::from_be_bytes(buf[..8].try_into().unwrap())),
            ElementType::Double => Self::Double(f64::from_be_bytes(buf[..8].try_into().unwrap())),
            ElementType::Vector3D => Self::Vector3D(decode_f64_array(buf)),
            ElementType::Vector6D => Self::Vector6D(decode_f64_array(buf)),
            ElementType::Vector6Int32 => Self::Vector6Int32(decode_i32_array(buf)),
            ElementType::Vector6Uint32 => Self::Vector6Uint32(decode_u32_array(buf)),
        };
        *buf = &buf[ty.wire_size()..];
        Ok(value)
    }
}

fn decode_f64_array<const N: usize>(buf: &[u8]) -> [f64; N] {
    let mut out = [0.0_f64; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = f64::from_be_bytes(buf[i * 8..i * 8 + 8].try_into().unwrap());
    }
    out
}

fn decode_i32_array<const N: usize>(buf: &[u8]) -> [i32; N] {
    let mut out = [0_i32; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = i32::from_be_bytes(buf[i * 4..i * 4 + 4].try_into().unwrap());
    }
    out
}

fn decode_u32_array<const N: usize>(buf: &[u8]) -> [u32; N] {
    let mut out = [0_u32; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = u32::from_be_bytes(buf[i * 4..i * 4 + 4].try_into().unwrap());
    }
    out
}

/// A negotiated input or output recipe: the controller-assigned id that
/// tags every streamed [`PackageType::DataPackage`](crate::PackageType) for
/// this recipe, plus the ordered `(variable, type)` list the reply echoed
/// back.
#[derive(Clone, Debug)]
pub struct RtsiRecipe {
    pub id: u8,
    pub variables: Vec<(String, ElementType)>,
}

impl RtsiRecipe {
    /// Decodes one `DataPackage` payload (recipe id already stripped) into
    /// `(variable, value)` pairs in recipe order.
    pub fn decode_values(&self, mut payload: &[u8]) -> Result<Vec<(String, RecipeValue)>, DriverError> {
        let mut out = Vec::with_capacity(self.variables.len());
        for (name, ty) in &self.variables {
            let value = RecipeValue::decode(*ty, &mut payload)?;
            out.push((name.clone(), value));
        }
        Ok(out)
    }

    /// Encodes an input recipe update in recipe order. `values` must supply
    /// every variable in the recipe; callers (the io interface's dirty-value
    /// cache) guarantee this by always initializing all of them at setup.
    pub fn encode_values(&self, values: &[RecipeValue]) -> Vec<u8> {
        let mut out = Vec::new();
        for value in values {
            value.encode(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_mixed_recipe_in_order() {
        let recipe = RtsiRecipe { id: 1, variables: vec![("timestamp".into(), ElementType::Double), ("robot_mode".into(), ElementType::Int32)] };
        let mut payload = Vec::new();
        payload.extend_from_slice(&1.5_f64.to_be_bytes());
        payload.extend_from_slice(&7_i32.to_be_bytes());

        let values = recipe.decode_values(&payload).unwrap();
        assert_eq!(values, vec![("timestamp".to_owned(), RecipeValue::Double(1.5)), ("robot_mode".to_owned(), RecipeValue::Int32(7))]);
    }

    #[test]
    fn vector6d_roundtrips() {
        let v = RecipeValue::Vector6D([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut buf = Vec::new();
        v.encode(&mut buf);
        let mut slice = buf.as_slice();
        assert_eq!(RecipeValue::decode(ElementType::Vector6D, &mut slice).unwrap(), v);
        assert!(slice.is_empty());
    }

    #[test]
    fn short_buffer_is_a_parse_failure() {
        let mut buf: &[u8] = &[0, 0];
        assert!(RecipeValue::decode(ElementType::Int32, &mut buf).is_err());
    }
}
