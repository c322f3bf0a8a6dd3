//! A value source is what an operand slot holds before the resolver runs:
//! either a number known outright, or a symbolic reference that only
//! becomes a number once every label's offset is known.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueSource {
    Immediate(u32),
    Label { name: String, offset: i32 },
}

impl ValueSource {
    pub fn immediate(self) -> Option<u32> {
        match self {
            ValueSource::Immediate(v) => Some(v),
            ValueSource::Label { .. } => None,
        }
    }
}
