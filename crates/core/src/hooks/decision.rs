//! Per-dispatch decision state
//!
//! Each dispatch pushes a frame onto a thread-local stack; listeners write
//! the decision of the innermost running dispatch of their hook point. A
//! nested dispatch through the same point gets its own frame, so it never
//! clobbers the decision of the call it interrupted.

use std::cell::RefCell;

/// Whether the original runs after all listeners returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Decision {
    /// Call the original and return its value
    #[default]
    CallOriginal,
    /// Skip the original and return the last listener's value
    Supercede,
    /// Behaves like `CallOriginal`
    Ignore,
}

struct Frame {
    point: u64,
    decision: Decision,
}

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Active decision frame, popped on drop
pub(crate) struct DecisionFrame {
    depth: usize,
}

impl DecisionFrame {
    /// Open a frame for `point` with the default decision
    pub(crate) fn enter(point: u64) -> Self {
        FRAMES.with(|frames| {
            let mut frames = frames.borrow_mut();
            frames.push(Frame {
                point,
                decision: Decision::CallOriginal,
            });
            Self {
                depth: frames.len(),
            }
        })
    }

    /// Final decision of this dispatch
    pub(crate) fn decision(&self) -> Decision {
        FRAMES.with(|frames| {
            frames
                .borrow()
                .get(self.depth - 1)
                .map(|frame| frame.decision)
                .unwrap_or_default()
        })
    }
}

impl Drop for DecisionFrame {
    fn drop(&mut self) {
        FRAMES.with(|frames| frames.borrow_mut().truncate(self.depth - 1));
    }
}

/// Set the decision of the innermost running dispatch of `point`
///
/// Returns `false` when this thread is not dispatching through `point`.
pub(crate) fn set(point: u64, decision: Decision) -> bool {
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        match frames.iter_mut().rev().find(|frame| frame.point == point) {
            Some(frame) => {
                frame.decision = decision;
                true
            }
            None => false,
        }
    })
}

/// Whether this thread is inside a dispatch of `point`
pub(crate) fn in_dispatch(point: u64) -> bool {
    FRAMES.with(|frames| frames.borrow().iter().any(|frame| frame.point == point))
}
