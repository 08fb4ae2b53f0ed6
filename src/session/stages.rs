/// Per-step lifecycle inside a [`StagePlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Active,
    Complete,
    Failed,
}

impl StepState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepState::Complete | StepState::Failed)
    }
}

/// Fixed, ordered list of the stage identifiers a pipeline is expected to
/// pass through. The backend may skip stages or report them out of band, so
/// entering a stage retroactively completes every earlier step that is not
/// already in a terminal state.
#[derive(Debug, Clone, Default)]
pub struct StagePlan {
    steps: Vec<(String, StepState)>,
}

impl StagePlan {
    pub fn new<I, S>(stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: stages
                .into_iter()
                .map(|stage| (stage.into(), StepState::Pending))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn state(&self, stage: &str) -> Option<StepState> {
        self.steps
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, state)| *state)
    }

    /// Activate `stage` if it is tracked. Returns the names of earlier steps
    /// that were caught up to `Complete` by this transition, in plan order.
    /// Unknown stages leave the plan untouched.
    pub fn enter(&mut self, stage: &str) -> Vec<String> {
        let Some(position) = self.steps.iter().position(|(name, _)| name == stage) else {
            return Vec::new();
        };

        let mut caught_up = Vec::new();
        for (name, state) in &mut self.steps[..position] {
            if !state.is_terminal() {
                *state = StepState::Complete;
                caught_up.push(name.clone());
            }
        }

        let (_, state) = &mut self.steps[position];
        if !state.is_terminal() {
            *state = StepState::Active;
        }
        caught_up
    }

    /// Mark every non-terminal step complete (successful end of stream).
    pub fn complete_all(&mut self) -> Vec<String> {
        let mut caught_up = Vec::new();
        for (name, state) in &mut self.steps {
            if !state.is_terminal() {
                *state = StepState::Complete;
                caught_up.push(name.clone());
            }
        }
        caught_up
    }

    /// Mark the currently active step failed, if there is one.
    pub fn fail_active(&mut self) {
        if let Some((_, state)) = self
            .steps
            .iter_mut()
            .find(|(_, state)| *state == StepState::Active)
        {
            *state = StepState::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> StagePlan {
        StagePlan::new(["analyze", "keyword_research", "generate", "review"])
    }

    #[test]
    fn test_enter_activates_step() {
        let mut plan = plan();
        assert!(plan.enter("analyze").is_empty());
        assert_eq!(plan.state("analyze"), Some(StepState::Active));
        assert_eq!(plan.state("generate"), Some(StepState::Pending));
    }

    #[test]
    fn test_skipping_ahead_completes_earlier_steps() {
        let mut plan = plan();
        plan.enter("analyze");
        let caught_up = plan.enter("generate");
        assert_eq!(caught_up, vec!["analyze", "keyword_research"]);
        assert_eq!(plan.state("analyze"), Some(StepState::Complete));
        assert_eq!(plan.state("keyword_research"), Some(StepState::Complete));
        assert_eq!(plan.state("generate"), Some(StepState::Active));
    }

    #[test]
    fn test_unknown_stage_is_a_no_op() {
        let mut plan = plan();
        plan.enter("analyze");
        assert!(plan.enter("mystery_stage").is_empty());
        assert_eq!(plan.state("analyze"), Some(StepState::Active));
    }

    #[test]
    fn test_terminal_steps_are_not_reactivated() {
        let mut plan = plan();
        plan.enter("generate");
        plan.fail_active();
        assert_eq!(plan.state("generate"), Some(StepState::Failed));
        // Re-entering a failed step leaves it failed.
        plan.enter("generate");
        assert_eq!(plan.state("generate"), Some(StepState::Failed));
    }

    #[test]
    fn test_complete_all_finishes_remaining_steps() {
        let mut plan = plan();
        plan.enter("keyword_research");
        let finished = plan.complete_all();
        assert_eq!(
            finished,
            vec!["keyword_research", "generate", "review"]
        );
    }
}
