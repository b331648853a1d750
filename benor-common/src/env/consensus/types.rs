use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A process's binary preference.
///
/// `Undecided` is the "no strong majority" marker produced by phase R; it is
/// never counted toward either threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Zero,
    One,
    Undecided,
}

impl Value {
    /// Maps a fair coin flip onto a binary value.
    pub fn from_bit(bit: bool) -> Self {
        if bit { Value::One } else { Value::Zero }
    }

    pub fn is_binary(&self) -> bool {
        !matches!(self, Value::Undecided)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Value::Zero => "0",
            Value::One => "1",
            Value::Undecided => "?",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Value {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Value::Zero),
            "1" => Ok(Value::One),
            "?" => Ok(Value::Undecided),
            other => Err(format!("invalid value '{}', expected 0, 1 or ?", other)),
        }
    }
}

// On the wire 0 and 1 travel as JSON numbers and Undecided as the string "?".
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Zero => serializer.serialize_u8(0),
            Value::One => serializer.serialize_u8(1),
            Value::Undecided => serializer.serialize_str("?"),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> de::Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("0, 1 or \"?\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
                match v {
                    0 => Ok(Value::Zero),
                    1 => Ok(Value::One),
                    _ => Err(E::invalid_value(de::Unexpected::Unsigned(v), &self)),
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
                match v {
                    0 => Ok(Value::Zero),
                    1 => Ok(Value::One),
                    _ => Err(E::invalid_value(de::Unexpected::Signed(v), &self)),
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
                v.parse()
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

/// The two phases of a Ben-Or round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Round vote: every process reports its current preference.
    #[serde(rename = "R")]
    Report,
    /// Post vote: every process reports the majority it observed in phase R.
    #[serde(rename = "P")]
    Propose,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Report => write!(f, "R"),
            Phase::Propose => write!(f, "P"),
        }
    }
}

/// Round numbers start at 1.
pub type Round = u64;

/// Counts how many times consensus was restarted on a process; the first
/// run is 0.
pub type RunId = u64;

fn is_first_run(run: &RunId) -> bool {
    *run == 0
}

/// A single vote as exchanged between processes.
///
/// `run` tells votes of a restarted run apart from leftovers of the previous
/// one. It is omitted on the wire for the first run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteMessage {
    pub phase: Phase,
    pub round: Round,
    pub value: Value,
    #[serde(default, skip_serializing_if = "is_first_run")]
    pub run: RunId,
}

impl VoteMessage {
    pub fn new(phase: Phase, round: Round, value: Value) -> Self {
        Self {
            phase,
            round,
            value,
            run: 0,
        }
    }

    pub fn with_run(mut self, run: RunId) -> Self {
        self.run = run;
        self
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for VoteMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, k={}, x={})", self.phase, self.round, self.value)?;
        if self.run > 0 {
            write!(f, " run={}", self.run)?;
        }
        Ok(())
    }
}
