//! Band buffer role assignment across frames.
//!
//! Every band owns two buffers (three in scalable streams). Before a frame is
//! decoded the roles are advanced according to the type of the previous
//! frame and the type of the frame about to be decoded: one buffer becomes
//! the write target, another the motion compensation reference.

use crate::header::FrameType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRoles {
    /// Two buffers alternate: `switch` is written, `switch ^ 1` is read.
    Simple { switch: usize },
    /// Scalable inter frames ping-pong between `dst` and `spare`
    /// independently of the base switch.
    Scalable {
        switch: usize,
        dst: usize,
        reference: usize,
        spare: usize,
    },
}

impl Default for BufferRoles {
    fn default() -> Self {
        Self::Simple { switch: 0 }
    }
}

impl BufferRoles {
    pub fn dst(&self) -> usize {
        match *self {
            Self::Simple { switch } => switch,
            Self::Scalable { dst, .. } => dst,
        }
    }

    pub fn reference(&self) -> usize {
        match *self {
            Self::Simple { switch } => switch ^ 1,
            Self::Scalable { reference, .. } => reference,
        }
    }

    fn switch(&self) -> usize {
        match *self {
            Self::Simple { switch } | Self::Scalable { switch, .. } => switch,
        }
    }

    /// Roles for the frame of type `cur` that follows a frame of type `prev`.
    pub fn transition(self, prev: Option<FrameType>, cur: FrameType) -> Self {
        let after_prev = match (prev, self) {
            (Some(FrameType::Intra | FrameType::Inter), Self::Simple { switch }) => {
                Self::Simple { switch: switch ^ 1 }
            }
            (Some(FrameType::Intra | FrameType::Inter), Self::Scalable { switch, spare, .. }) => {
                let switch = switch ^ 1;
                Self::Scalable {
                    switch,
                    dst: switch,
                    reference: switch ^ 1,
                    spare,
                }
            }
            (Some(FrameType::InterScalable), Self::Simple { switch }) => Self::Scalable {
                switch,
                dst: 2,
                reference: switch,
                spare: switch,
            },
            (Some(FrameType::InterScalable), Self::Scalable { switch, dst, spare, .. }) => {
                Self::Scalable {
                    switch,
                    dst: spare,
                    reference: dst,
                    spare: dst,
                }
            }
            _ => self,
        };

        match cur {
            FrameType::Intra => Self::Simple { switch: 0 },
            FrameType::Inter => Self::Simple {
                switch: after_prev.switch(),
            },
            _ => after_prev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use FrameType::*;

    fn run(types: &[FrameType]) -> Vec<(usize, usize)> {
        let mut roles = BufferRoles::default();
        let mut prev = None;
        let mut out = Vec::new();
        for &t in types {
            roles = roles.transition(prev, t);
            out.push((roles.dst(), roles.reference()));
            prev = Some(t);
        }
        out
    }

    #[test]
    fn test_intra_inter_alternate() {
        assert_eq!(run(&[Intra, Inter, Inter, Inter]), vec![(0, 1), (1, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn test_intra_resets_switch() {
        assert_eq!(run(&[Intra, Inter, Intra, Inter]), vec![(0, 1), (1, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn test_noref_and_null_keep_roles() {
        assert_eq!(
            run(&[Intra, Inter, InterNoRef, InterNoRef, Null]),
            vec![(0, 1), (1, 0), (0, 1), (0, 1), (0, 1)]
        );
    }

    #[test]
    fn test_scalable_sequence() {
        // First scalable frame decodes into the regular slot, later ones
        // ping-pong with the third buffer.
        assert_eq!(
            run(&[Intra, InterScalable, InterScalable, InterScalable, Inter]),
            vec![(0, 1), (1, 0), (2, 1), (1, 2), (1, 0)]
        );
    }

    #[test]
    fn test_transition_is_pure() {
        let roles = BufferRoles::Simple { switch: 1 };
        let a = roles.transition(Some(Inter), Inter);
        let b = roles.transition(Some(Inter), Inter);
        assert_eq!(a, b);
        assert_eq!(roles, BufferRoles::Simple { switch: 1 });
    }
}
