use std::collections::HashMap;

use super::types::Stage;

/// Explicit transition table for the deploy state machine. Conditional
/// stages (Replacing, Starting) can be skipped, so their predecessors
/// list both the conditional stage and its successor.
pub fn valid_stage_transition(src: &Stage, dst: &Stage) -> bool {
    let stage_transition_map: HashMap<Stage, Vec<Stage>> = {
        let mut map = HashMap::new();
        map.insert(
            Stage::Received,
            vec![Stage::Replacing, Stage::Pulling, Stage::Failed],
        );
        map.insert(Stage::Replacing, vec![Stage::Pulling, Stage::Failed]);
        map.insert(Stage::Pulling, vec![Stage::CreatingVolumes, Stage::Failed]);
        map.insert(Stage::CreatingVolumes, vec![Stage::Creating, Stage::Failed]);
        map.insert(Stage::Creating, vec![Stage::Starting, Stage::Failed]);
        map.insert(Stage::Starting, vec![Stage::Complete, Stage::Failed]);
        map.insert(Stage::Complete, vec![]);
        map.insert(Stage::Failed, vec![]);
        map
    };

    if let Some(valid_stages) = stage_transition_map.get(src) {
        valid_stages.contains(dst)
    } else {
        false
    }
}
