//! Segment editor.
//!
//! Holds a working copy of the segment list as drafts: identity fields plus
//! duration hints, without positions in time. Edits touch only the drafts;
//! the committed timeline (what the renderer shows) changes only when
//! [`SegmentEditor::commit`] has persisted a recomputed table.

use storyreel_common::DurationPolicy;
use storyreel_project_model::{
    recompute_with_policy, ApiError, Effect, KenBurns, MotionPreset, SegmentDraft, Timeline,
    TimelineApi, TimingError,
};

/// Persistence state of the working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    /// Drafts match the committed timeline.
    Clean,
    /// Drafts carry uncommitted edits.
    Dirty,
    /// A commit is in flight.
    Saving,
}

/// Errors from editing or committing.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("segment index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("cannot lay out segments: {0}")]
    Timing(#[from] TimingError),

    #[error("commit failed: {0}")]
    Persistence(#[from] ApiError),
}

pub type EditorResult<T> = Result<T, EditorError>;

/// Working copy of a timeline's segment list.
#[derive(Debug, Clone)]
pub struct SegmentEditor {
    committed: Timeline,
    drafts: Vec<SegmentDraft>,
    state: EditorState,
    policy: DurationPolicy,
}

impl SegmentEditor {
    pub fn new(timeline: Timeline, policy: DurationPolicy) -> Self {
        let drafts = timeline.drafts();
        Self {
            committed: timeline,
            drafts,
            state: EditorState::Clean,
            policy,
        }
    }

    /// The last committed timeline.
    pub fn timeline(&self) -> &Timeline {
        &self.committed
    }

    pub fn drafts(&self) -> &[SegmentDraft] {
        &self.drafts
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    /// Whether edits are not yet persisted. An interrupted commit counts.
    pub fn is_dirty(&self) -> bool {
        self.state != EditorState::Clean
    }

    pub fn policy(&self) -> DurationPolicy {
        self.policy
    }

    /// Move the segment at `from` so it ends up at `to` (drag semantics:
    /// remove, then insert).
    pub fn reorder(&mut self, from: usize, to: usize) -> EditorResult<()> {
        self.check(from)?;
        self.check(to)?;
        if from == to {
            return Ok(());
        }
        let draft = self.drafts.remove(from);
        self.drafts.insert(to, draft);
        tracing::debug!(from, to, "Reordered segment");
        self.touch();
        Ok(())
    }

    /// Exchange two segments.
    pub fn swap(&mut self, a: usize, b: usize) -> EditorResult<()> {
        self.check(a)?;
        self.check(b)?;
        if a != b {
            self.drafts.swap(a, b);
            self.touch();
        }
        Ok(())
    }

    /// Drop a segment; the rest share its time on commit.
    pub fn remove(&mut self, index: usize) -> EditorResult<SegmentDraft> {
        self.check(index)?;
        let draft = self.drafts.remove(index);
        self.touch();
        Ok(draft)
    }

    pub fn set_effect(&mut self, index: usize, effect: Effect) -> EditorResult<()> {
        self.check(index)?;
        self.drafts[index].effect = effect;
        self.touch();
        Ok(())
    }

    /// Set the motion preset, enabling Ken Burns if the segment had none.
    pub fn set_ken_burns_preset(&mut self, index: usize, preset: MotionPreset) -> EditorResult<()> {
        self.check(index)?;
        let draft = &mut self.drafts[index];
        match &mut draft.ken_burns {
            Some(ken_burns) => ken_burns.preset = preset,
            None => {
                draft.ken_burns = Some(KenBurns {
                    enabled: true,
                    preset,
                })
            }
        }
        self.touch();
        Ok(())
    }

    /// Enable or disable Ken Burns. Enabling a segment without a descriptor
    /// gives it the default preset.
    pub fn toggle_ken_burns(&mut self, index: usize, enabled: bool) -> EditorResult<()> {
        self.check(index)?;
        let draft = &mut self.drafts[index];
        match &mut draft.ken_burns {
            Some(ken_burns) => ken_burns.enabled = enabled,
            None if enabled => {
                draft.ken_burns = Some(KenBurns {
                    enabled: true,
                    preset: MotionPreset::default(),
                })
            }
            None => return Ok(()),
        }
        self.touch();
        Ok(())
    }

    /// Throw away uncommitted edits.
    pub fn discard(&mut self) {
        self.drafts = self.committed.drafts();
        self.state = EditorState::Clean;
    }

    /// The timeline the drafts would commit to, without persisting it.
    pub fn draft_timeline(&self) -> EditorResult<Timeline> {
        let segments =
            recompute_with_policy(&self.drafts, self.committed.total_duration, self.policy)?;
        Ok(Timeline {
            segments,
            ..self.committed.clone()
        })
    }

    /// Recompute and persist the drafts. On success the result becomes the
    /// committed timeline; on failure the edits are kept and stay dirty.
    pub async fn commit(&mut self, api: &dyn TimelineApi, project_id: &str) -> EditorResult<()> {
        let timeline = match self.draft_timeline() {
            Ok(timeline) => timeline,
            Err(e) => {
                tracing::warn!(project_id, error = %e, "Refusing to commit invalid layout");
                return Err(e);
            }
        };

        self.state = EditorState::Saving;
        match api.update_timeline(project_id, &timeline).await {
            Ok(()) => {
                tracing::info!(
                    project_id,
                    segments = timeline.segments.len(),
                    "Committed timeline edits"
                );
                self.drafts = timeline.drafts();
                self.committed = timeline;
                self.state = EditorState::Clean;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(project_id, error = %e, "Timeline commit failed");
                self.state = EditorState::Dirty;
                Err(EditorError::Persistence(e))
            }
        }
    }

    fn check(&self, index: usize) -> EditorResult<()> {
        if index < self.drafts.len() {
            Ok(())
        } else {
            Err(EditorError::IndexOutOfRange {
                index,
                len: self.drafts.len(),
            })
        }
    }

    fn touch(&mut self) {
        self.state = EditorState::Dirty;
    }
}
