//! Contract interface descriptions
//!
//! Parses the JSON interface description emitted by the compiler and maps
//! every parameter type to an explicit encode/decode pair. JSON literals go
//! in, ABI tokens go to the ledger, and decoded tokens come back as JSON.
//!
//! Integers travel as exact decimal strings in both directions and never
//! pass through floating point.

use crate::crypto::{event_topic, format_address, function_selector, parse_address};
use ethers::abi::{self, ParamType, Token};
use ethers::types::{H256, U256};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Interface and argument errors, all raised before any network call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AbiError {
    #[error("Method is not defined in the interface: {0}")]
    UnknownMethod(String),
    #[error("Method argument count mismatch: {method} expects {expected}, got {actual}")]
    ArgumentCountMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("Unsupported parameter type: {0}")]
    InvalidType(String),
    #[error("Invalid interface description: {0}")]
    InvalidInterface(String),
    #[error("Failed to decode {what}: {message}")]
    Decode { what: String, message: String },
}

/// A named, typed parameter of a method or event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<TypedParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
    #[serde(
        rename = "internalType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub internal_type: Option<String>,
}

impl TypedParam {
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            components: Vec::new(),
            indexed: None,
            internal_type: None,
        }
    }

    pub fn abi_type(&self) -> Result<AbiType, AbiError> {
        AbiType::parse(&self.kind, &self.components)
    }
}

/// Mutability as written by older and newer compilers
#[derive(Debug, Clone, Deserialize)]
struct RawMutability {
    #[serde(default)]
    constant: Option<bool>,
    #[serde(default)]
    payable: Option<bool>,
    #[serde(rename = "stateMutability", default)]
    state_mutability: Option<String>,
}

impl RawMutability {
    fn constant(&self) -> bool {
        match self.state_mutability.as_deref() {
            Some(m) => m == "view" || m == "pure",
            None => self.constant.unwrap_or(false),
        }
    }

    fn payable(&self) -> bool {
        match self.state_mutability.as_deref() {
            Some(m) => m == "payable",
            None => self.payable.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawFunction {
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<TypedParam>,
    #[serde(default)]
    outputs: Vec<TypedParam>,
    #[serde(flatten)]
    mutability: RawMutability,
}

/// One callable method of a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFunction")]
pub struct MethodDescriptor {
    pub name: String,
    pub inputs: Vec<TypedParam>,
    pub outputs: Vec<TypedParam>,
    /// Read-only: evaluated locally, never submitted
    pub constant: bool,
    /// Accepts value along with the call
    pub payable: bool,
    #[serde(rename = "stateMutability", skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<String>,
}

impl From<RawFunction> for MethodDescriptor {
    fn from(raw: RawFunction) -> Self {
        Self {
            constant: raw.mutability.constant(),
            payable: raw.mutability.payable(),
            state_mutability: raw.mutability.state_mutability,
            name: raw.name,
            inputs: raw.inputs,
            outputs: raw.outputs,
        }
    }
}

impl MethodDescriptor {
    /// Canonical signature, e.g. `createOrder(uint256)`
    pub fn signature(&self) -> Result<String, AbiError> {
        Ok(format!("{}({})", self.name, canonical_list(&self.inputs)?))
    }

    pub fn selector(&self) -> Result<[u8; 4], AbiError> {
        Ok(function_selector(&self.signature()?))
    }

    /// Convert JSON arguments to tokens, checking arity and types
    pub fn encode_args(&self, args: &[Value]) -> Result<Vec<Token>, AbiError> {
        if args.len() != self.inputs.len() {
            return Err(AbiError::ArgumentCountMismatch {
                method: self.name.clone(),
                expected: self.inputs.len(),
                actual: args.len(),
            });
        }
        encode_params(&self.inputs, args)
    }

    /// Call data: selector followed by the encoded arguments
    pub fn call_data(&self, tokens: &[Token]) -> Result<Vec<u8>, AbiError> {
        let mut data = self.selector()?.to_vec();
        data.extend(abi::encode(tokens));
        Ok(data)
    }

    /// Decode returned data into `(name, value)` pairs, one per output
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<(String, Value)>, AbiError> {
        decode_params(&self.outputs, data, &self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawConstructor {
    #[serde(default)]
    inputs: Vec<TypedParam>,
    #[serde(flatten)]
    mutability: RawMutability,
}

/// The constructor of a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawConstructor")]
pub struct ConstructorDescriptor {
    pub inputs: Vec<TypedParam>,
    pub payable: bool,
    #[serde(rename = "stateMutability", skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<String>,
}

impl From<RawConstructor> for ConstructorDescriptor {
    fn from(raw: RawConstructor) -> Self {
        Self {
            payable: raw.mutability.payable(),
            state_mutability: raw.mutability.state_mutability,
            inputs: raw.inputs,
        }
    }
}

/// An event a contract may emit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDescriptor {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<TypedParam>,
    #[serde(default)]
    pub anonymous: bool,
}

impl EventDescriptor {
    pub fn signature(&self) -> Result<String, AbiError> {
        Ok(format!("{}({})", self.name, canonical_list(&self.inputs)?))
    }

    /// Topic 0 of logs emitted by this event
    pub fn topic(&self) -> Result<H256, AbiError> {
        Ok(event_topic(&self.signature()?))
    }

    /// Decode a log into named fields in declaration order.
    ///
    /// Indexed dynamic values only exist as hashes in the topics and are
    /// returned as hex.
    pub fn decode_log(&self, topics: &[H256], data: &[u8]) -> Result<Map<String, Value>, AbiError> {
        let skip = if self.anonymous { 0 } else { 1 };
        let mut indexed_topics = topics.iter().skip(skip);

        let plain: Vec<TypedParam> = self
            .inputs
            .iter()
            .filter(|p| !p.indexed.unwrap_or(false))
            .cloned()
            .collect();
        let mut plain_values = decode_params(&plain, data, &self.name)?.into_iter();

        let mut fields = Map::new();
        for (position, param) in self.inputs.iter().enumerate() {
            let value = if param.indexed.unwrap_or(false) {
                let topic = indexed_topics.next().ok_or_else(|| AbiError::Decode {
                    what: self.name.clone(),
                    message: "missing indexed topic".to_string(),
                })?;
                let ty = param.abi_type()?;
                if ty.is_dynamic() {
                    Value::String(format!("{:?}", topic))
                } else {
                    let tokens = abi::decode(&[ty.to_param_type()], topic.as_bytes())
                        .map_err(|e| decode_error(&self.name, e))?;
                    match tokens.into_iter().next() {
                        Some(token) => ty.decode_token(token),
                        None => Value::Null,
                    }
                }
            } else {
                plain_values.next().map(|(_, v)| v).unwrap_or(Value::Null)
            };
            fields.insert(field_name(param, position), value);
        }
        Ok(fields)
    }
}

/// One entry of an interface description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AbiEntry {
    Function(MethodDescriptor),
    Constructor(ConstructorDescriptor),
    Event(EventDescriptor),
    Fallback,
    Receive,
    #[serde(other)]
    Other,
}

/// The full interface description of one contract
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Interface {
    entries: Vec<AbiEntry>,
}

impl Interface {
    pub fn new(entries: Vec<AbiEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self, AbiError> {
        serde_json::from_str(json).map_err(|e| AbiError::InvalidInterface(e.to_string()))
    }

    pub fn from_value(value: Value) -> Result<Self, AbiError> {
        serde_json::from_value(value).map_err(|e| AbiError::InvalidInterface(e.to_string()))
    }

    pub fn entries(&self) -> &[AbiEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.entries.iter().filter_map(|entry| match entry {
            AbiEntry::Function(method) => Some(method),
            _ => None,
        })
    }

    pub fn events(&self) -> impl Iterator<Item = &EventDescriptor> {
        self.entries.iter().filter_map(|entry| match entry {
            AbiEntry::Event(event) => Some(event),
            _ => None,
        })
    }

    pub fn constructor(&self) -> Option<&ConstructorDescriptor> {
        self.entries.iter().find_map(|entry| match entry {
            AbiEntry::Constructor(ctor) => Some(ctor),
            _ => None,
        })
    }

    /// First method with this name
    pub fn method(&self, name: &str) -> Result<&MethodDescriptor, AbiError> {
        self.methods()
            .find(|m| m.name == name)
            .ok_or_else(|| AbiError::UnknownMethod(name.to_string()))
    }

    /// Overload of `name` taking `arity` arguments
    pub fn resolve(&self, name: &str, arity: usize) -> Result<&MethodDescriptor, AbiError> {
        let first = self.method(name)?;
        match self
            .methods()
            .find(|m| m.name == name && m.inputs.len() == arity)
        {
            Some(method) => Ok(method),
            None => Err(AbiError::ArgumentCountMismatch {
                method: name.to_string(),
                expected: first.inputs.len(),
                actual: arity,
            }),
        }
    }

    /// Event whose topic 0 matches
    pub fn event_by_topic(&self, topic: &H256) -> Option<&EventDescriptor> {
        self.events()
            .filter(|e| !e.anonymous)
            .find(|e| e.topic().map(|t| t == *topic).unwrap_or(false))
    }

    /// Encode constructor arguments; an interface without a constructor takes none
    pub fn encode_constructor_args(&self, args: &[Value]) -> Result<Vec<u8>, AbiError> {
        let inputs = self
            .constructor()
            .map(|c| c.inputs.as_slice())
            .unwrap_or(&[]);

        if inputs.len() != args.len() {
            return Err(AbiError::ArgumentCountMismatch {
                method: "constructor".to_string(),
                expected: inputs.len(),
                actual: args.len(),
            });
        }

        Ok(abi::encode(&encode_params(inputs, args)?))
    }
}

/// ABI parameter types and their JSON conversions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiType {
    Uint(usize),
    Int(usize),
    Address,
    Bool,
    String,
    Bytes,
    FixedBytes(usize),
    Array(Box<AbiType>),
    FixedArray(Box<AbiType>, usize),
    Tuple(Vec<(String, AbiType)>),
}

impl AbiType {
    /// Parse a type name such as `uint256`, `bytes32[]` or `tuple`
    pub fn parse(kind: &str, components: &[TypedParam]) -> Result<Self, AbiError> {
        let kind = kind.trim();

        if let Some(stripped) = kind.strip_suffix(']') {
            let open = stripped
                .rfind('[')
                .ok_or_else(|| AbiError::InvalidType(kind.to_string()))?;
            let inner = Box::new(Self::parse(&stripped[..open], components)?);
            let size = &stripped[open + 1..];
            return if size.is_empty() {
                Ok(AbiType::Array(inner))
            } else {
                let n = size
                    .parse()
                    .map_err(|_| AbiError::InvalidType(kind.to_string()))?;
                Ok(AbiType::FixedArray(inner, n))
            };
        }

        match kind {
            "address" => return Ok(AbiType::Address),
            "bool" => return Ok(AbiType::Bool),
            "string" => return Ok(AbiType::String),
            "bytes" => return Ok(AbiType::Bytes),
            "uint" => return Ok(AbiType::Uint(256)),
            "int" => return Ok(AbiType::Int(256)),
            "tuple" => {
                let fields = components
                    .iter()
                    .map(|c| Ok((c.name.clone(), c.abi_type()?)))
                    .collect::<Result<Vec<_>, AbiError>>()?;
                return Ok(AbiType::Tuple(fields));
            }
            _ => {}
        }

        let sized = |prefix: &str, max: usize, step: usize| -> Option<usize> {
            let n: usize = kind.strip_prefix(prefix)?.parse().ok()?;
            (n > 0 && n <= max && n % step == 0).then_some(n)
        };

        if let Some(bits) = sized("uint", 256, 8) {
            Ok(AbiType::Uint(bits))
        } else if let Some(bits) = sized("int", 256, 8) {
            Ok(AbiType::Int(bits))
        } else if let Some(len) = sized("bytes", 32, 1) {
            Ok(AbiType::FixedBytes(len))
        } else {
            Err(AbiError::InvalidType(kind.to_string()))
        }
    }

    /// Name used in canonical signatures
    pub fn canonical(&self) -> String {
        match self {
            AbiType::Uint(bits) => format!("uint{}", bits),
            AbiType::Int(bits) => format!("int{}", bits),
            AbiType::Address => "address".to_string(),
            AbiType::Bool => "bool".to_string(),
            AbiType::String => "string".to_string(),
            AbiType::Bytes => "bytes".to_string(),
            AbiType::FixedBytes(n) => format!("bytes{}", n),
            AbiType::Array(inner) => format!("{}[]", inner.canonical()),
            AbiType::FixedArray(inner, n) => format!("{}[{}]", inner.canonical(), n),
            AbiType::Tuple(fields) => format!(
                "({})",
                fields
                    .iter()
                    .map(|(_, t)| t.canonical())
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        }
    }

    pub fn to_param_type(&self) -> ParamType {
        match self {
            AbiType::Uint(bits) => ParamType::Uint(*bits),
            AbiType::Int(bits) => ParamType::Int(*bits),
            AbiType::Address => ParamType::Address,
            AbiType::Bool => ParamType::Bool,
            AbiType::String => ParamType::String,
            AbiType::Bytes => ParamType::Bytes,
            AbiType::FixedBytes(n) => ParamType::FixedBytes(*n),
            AbiType::Array(inner) => ParamType::Array(Box::new(inner.to_param_type())),
            AbiType::FixedArray(inner, n) => {
                ParamType::FixedArray(Box::new(inner.to_param_type()), *n)
            }
            AbiType::Tuple(fields) => {
                ParamType::Tuple(fields.iter().map(|(_, t)| t.to_param_type()).collect())
            }
        }
    }

    /// Types whose indexed event values are stored as hashes
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            AbiType::String
                | AbiType::Bytes
                | AbiType::Array(_)
                | AbiType::FixedArray(..)
                | AbiType::Tuple(_)
        )
    }

    /// Convert a JSON literal to a token of this type
    pub fn encode_value(&self, value: &Value) -> Result<Token, AbiError> {
        match self {
            AbiType::Uint(bits) => {
                let n = parse_unsigned(value)?;
                if *bits < 256 && n.bits() > *bits {
                    return Err(invalid(value, &self.canonical()));
                }
                Ok(Token::Uint(n))
            }
            AbiType::Int(bits) => parse_signed(value, *bits).map(Token::Int),
            AbiType::Address => {
                let s = value.as_str().ok_or_else(|| invalid(value, "address"))?;
                parse_address(s)
                    .map(Token::Address)
                    .map_err(|e| AbiError::InvalidArguments(e.to_string()))
            }
            AbiType::Bool => value
                .as_bool()
                .map(Token::Bool)
                .ok_or_else(|| invalid(value, "bool")),
            AbiType::String => value
                .as_str()
                .map(|s| Token::String(s.to_string()))
                .ok_or_else(|| invalid(value, "string")),
            AbiType::Bytes => parse_hex_bytes(value).map(Token::Bytes),
            AbiType::FixedBytes(n) => {
                let mut bytes = parse_hex_bytes(value)?;
                if bytes.len() > *n {
                    return Err(invalid(value, &self.canonical()));
                }
                bytes.resize(*n, 0);
                Ok(Token::FixedBytes(bytes))
            }
            AbiType::Array(inner) => {
                let items = value.as_array().ok_or_else(|| invalid(value, "array"))?;
                items
                    .iter()
                    .map(|item| inner.encode_value(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Token::Array)
            }
            AbiType::FixedArray(inner, n) => {
                let items = value
                    .as_array()
                    .filter(|items| items.len() == *n)
                    .ok_or_else(|| invalid(value, &self.canonical()))?;
                items
                    .iter()
                    .map(|item| inner.encode_value(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Token::FixedArray)
            }
            AbiType::Tuple(fields) => {
                let tokens = match value {
                    Value::Array(items) if items.len() == fields.len() => fields
                        .iter()
                        .zip(items)
                        .map(|((_, t), item)| t.encode_value(item))
                        .collect::<Result<Vec<_>, _>>()?,
                    Value::Object(map) => fields
                        .iter()
                        .map(|(name, t)| {
                            let item = map.get(name).ok_or_else(|| {
                                AbiError::InvalidArguments(format!("missing tuple field {}", name))
                            })?;
                            t.encode_value(item)
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                    _ => return Err(invalid(value, &self.canonical())),
                };
                Ok(Token::Tuple(tokens))
            }
        }
    }

    /// Convert a decoded token to JSON
    pub fn decode_token(&self, token: Token) -> Value {
        match (self, token) {
            (AbiType::Uint(_), Token::Uint(n)) => Value::String(n.to_string()),
            (AbiType::Int(_), Token::Int(n)) => Value::String(format_signed(n)),
            (_, Token::Address(address)) => Value::String(format_address(&address)),
            (_, Token::Bool(b)) => Value::Bool(b),
            (_, Token::String(s)) => Value::String(s),
            (_, Token::Bytes(bytes)) | (_, Token::FixedBytes(bytes)) => {
                Value::String(format!("0x{}", hex::encode(bytes)))
            }
            (AbiType::Array(inner), Token::Array(items))
            | (AbiType::FixedArray(inner, _), Token::FixedArray(items)) => Value::Array(
                items
                    .into_iter()
                    .map(|item| inner.decode_token(item))
                    .collect(),
            ),
            (AbiType::Tuple(fields), Token::Tuple(items)) => {
                let named = !fields.is_empty() && fields.iter().all(|(name, _)| !name.is_empty());
                let values = fields
                    .iter()
                    .zip(items)
                    .map(|((_, t), item)| t.decode_token(item));
                if named {
                    Value::Object(
                        fields
                            .iter()
                            .map(|(name, _)| name.clone())
                            .zip(values)
                            .collect(),
                    )
                } else {
                    Value::Array(values.collect())
                }
            }
            (_, Token::Uint(n)) => Value::String(n.to_string()),
            (_, Token::Int(n)) => Value::String(format_signed(n)),
            (_, Token::Array(items)) | (_, Token::FixedArray(items)) | (_, Token::Tuple(items)) => {
                Value::Array(items.into_iter().map(token_to_json).collect())
            }
        }
    }
}

/// Convert a token to JSON without type information
fn token_to_json(token: Token) -> Value {
    let ty = match &token {
        Token::Int(_) => AbiType::Int(256),
        _ => AbiType::Uint(256),
    };
    ty.decode_token(token)
}

fn canonical_list(params: &[TypedParam]) -> Result<String, AbiError> {
    Ok(params
        .iter()
        .map(|p| p.abi_type().map(|t| t.canonical()))
        .collect::<Result<Vec<_>, _>>()?
        .join(","))
}

fn encode_params(params: &[TypedParam], args: &[Value]) -> Result<Vec<Token>, AbiError> {
    params
        .iter()
        .zip(args)
        .map(|(param, arg)| param.abi_type()?.encode_value(arg))
        .collect()
}

fn decode_params(
    params: &[TypedParam],
    data: &[u8],
    what: &str,
) -> Result<Vec<(String, Value)>, AbiError> {
    let types = params
        .iter()
        .map(TypedParam::abi_type)
        .collect::<Result<Vec<_>, _>>()?;
    let param_types: Vec<ParamType> = types.iter().map(AbiType::to_param_type).collect();
    let tokens = abi::decode(&param_types, data).map_err(|e| decode_error(what, e))?;

    Ok(params
        .iter()
        .zip(types)
        .zip(tokens)
        .map(|((param, ty), token)| (param.name.clone(), ty.decode_token(token)))
        .collect())
}

fn field_name(param: &TypedParam, position: usize) -> String {
    if param.name.is_empty() {
        position.to_string()
    } else {
        param.name.clone()
    }
}

fn decode_error(what: &str, err: impl std::fmt::Display) -> AbiError {
    AbiError::Decode {
        what: what.to_string(),
        message: err.to_string(),
    }
}

fn invalid(value: &Value, expected: &str) -> AbiError {
    AbiError::InvalidArguments(format!("{} is not a valid {}", value, expected))
}

/// Literal digits of an integer argument, given as a JSON number or string
fn integer_literal(value: &Value) -> Option<String> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Some(text)
}

fn parse_unsigned(value: &Value) -> Result<U256, AbiError> {
    let text = integer_literal(value).ok_or_else(|| invalid(value, "unsigned integer"))?;
    parse_magnitude(&text).ok_or_else(|| invalid(value, "unsigned integer"))
}

fn parse_magnitude(text: &str) -> Option<U256> {
    if let Some(hex_digits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        if hex_digits.is_empty() || hex_digits.len() > 64 {
            return None;
        }
        return U256::from_str_radix(hex_digits, 16).ok();
    }
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    U256::from_dec_str(text).ok()
}

fn parse_signed(value: &Value, bits: usize) -> Result<U256, AbiError> {
    let text = integer_literal(value).ok_or_else(|| invalid(value, "integer"))?;
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let magnitude = parse_magnitude(digits).ok_or_else(|| invalid(value, "integer"))?;

    let limit = U256::one() << (bits - 1);
    let in_range = if negative {
        magnitude <= limit
    } else {
        magnitude < limit
    };
    if !in_range {
        return Err(invalid(value, &format!("int{}", bits)));
    }

    if negative && !magnitude.is_zero() {
        Ok((!magnitude).overflowing_add(U256::one()).0)
    } else {
        Ok(magnitude)
    }
}

fn format_signed(n: U256) -> String {
    if n.bit(255) {
        let magnitude = (!n).overflowing_add(U256::one()).0;
        format!("-{}", magnitude)
    } else {
        n.to_string()
    }
}

fn parse_hex_bytes(value: &Value) -> Result<Vec<u8>, AbiError> {
    let s = value.as_str().ok_or_else(|| invalid(value, "hex string"))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|_| invalid(value, "hex string"))
}
