//! The action-space shapes a policy can be built for.

use super::DynSpace;
use crate::MettaError;
use std::fmt;

/// Shape of the action space a policy controls.
///
/// Exactly two shapes are supported. Anything else is rejected when converting
/// from a [`DynSpace`], before any parameter is allocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionSpaceDescriptor {
    /// A single categorical choice among `n` actions.
    Discrete { n: usize },
    /// An action type among `n0` plus an independent parameter among `n1`.
    MultiDiscrete2 { n0: usize, n1: usize },
}

impl ActionSpaceDescriptor {
    /// Number of output heads the policy needs.
    pub fn num_heads(&self) -> usize {
        match self {
            Self::Discrete { .. } => 1,
            Self::MultiDiscrete2 { .. } => 2,
        }
    }

    /// Output width of each head, type head first.
    pub fn head_sizes(&self) -> Vec<usize> {
        match *self {
            Self::Discrete { n } => vec![n],
            Self::MultiDiscrete2 { n0, n1 } => vec![n0, n1],
        }
    }
}

impl TryFrom<&DynSpace> for ActionSpaceDescriptor {
    type Error = MettaError;

    fn try_from(space: &DynSpace) -> Result<Self, Self::Error> {
        match space {
            DynSpace::Discrete(d) if d.n > 0 => Ok(Self::Discrete { n: d.n }),
            DynSpace::MultiDiscrete(md) => match md.nvec.as_slice() {
                &[n0, n1] if n0 > 0 && n1 > 0 => Ok(Self::MultiDiscrete2 { n0, n1 }),
                _ => Err(MettaError::UnsupportedActionSpace(space.to_string())),
            },
            _ => Err(MettaError::UnsupportedActionSpace(space.to_string())),
        }
    }
}

impl fmt::Display for ActionSpaceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discrete { n } => write!(f, "Discrete({n})"),
            Self::MultiDiscrete2 { n0, n1 } => write!(f, "MultiDiscrete([{n0}, {n1}])"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spaces::{Box as BoxSpace, Discrete, MultiDiscrete};

    #[test]
    fn test_discrete_descriptor() {
        let desc = ActionSpaceDescriptor::try_from(&DynSpace::Discrete(Discrete::new(6))).unwrap();
        assert_eq!(desc, ActionSpaceDescriptor::Discrete { n: 6 });
        assert_eq!(desc.num_heads(), 1);
        assert_eq!(desc.head_sizes(), vec![6]);
    }

    #[test]
    fn test_multi_discrete_descriptor() {
        let space = DynSpace::MultiDiscrete(MultiDiscrete::new(vec![3, 9]));
        let desc = ActionSpaceDescriptor::try_from(&space).unwrap();
        assert_eq!(desc, ActionSpaceDescriptor::MultiDiscrete2 { n0: 3, n1: 9 });
        assert_eq!(desc.head_sizes(), vec![3, 9]);
    }

    #[test]
    fn test_unsupported_shapes_name_the_space() {
        let three = DynSpace::MultiDiscrete(MultiDiscrete::new(vec![2, 2, 2]));
        match ActionSpaceDescriptor::try_from(&three) {
            Err(MettaError::UnsupportedActionSpace(msg)) => {
                assert!(msg.contains("[2, 2, 2]"), "message was {msg}")
            }
            other => panic!("expected UnsupportedActionSpace, got {other:?}"),
        }

        let continuous = DynSpace::Box(BoxSpace::uniform(&[2], -1.0, 1.0));
        assert!(matches!(
            ActionSpaceDescriptor::try_from(&continuous),
            Err(MettaError::UnsupportedActionSpace(_))
        ));

        let single = DynSpace::MultiDiscrete(MultiDiscrete::new(vec![4]));
        assert!(ActionSpaceDescriptor::try_from(&single).is_err());
    }
}
