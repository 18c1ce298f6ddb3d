//! S6 — focus-weighted retrieval, plus the token-budget and
//! determinism properties from spec §8.

use sunwell_memory_core::Simulacrum;

#[test]
fn focus_on_a_topic_ranks_matching_learnings_first() {
    let mut sim = Simulacrum::new("session", 50, 0.9);
    sim.add_learning("JWT refresh token rotation", "auth", 0.8).unwrap();
    sim.add_learning("Redis eviction policies", "perf", 0.8).unwrap();

    sim.set_focus("auth", 0.8);

    let (text, result) = sim.assemble_context("Which tokens expire?", 2_000, true);

    assert!(!result.learnings.is_empty());
    let auth_idx = result
        .learnings
        .iter()
        .position(|(l, _)| l.category == "auth")
        .expect("auth learning present");
    let perf_idx = result
        .learnings
        .iter()
        .position(|(l, _)| l.category == "perf")
        .expect("perf learning present");
    assert!(auth_idx < perf_idx);

    let header_pos = text.find("Learnings").expect("Learnings section header present");
    let jwt_pos = text.find("JWT refresh token rotation").expect("JWT learning rendered");
    let redis_pos = text.find("Redis eviction policies").expect("Redis learning rendered");
    assert!(header_pos < jwt_pos);
    assert!(jwt_pos < redis_pos);
}

#[test]
fn to_context_never_exceeds_the_token_budget() {
    let mut sim = Simulacrum::new("session", 50, 0.9);
    for i in 0..30 {
        sim.add_learning(format!("fact number {i} about the system"), "project", 0.7)
            .unwrap();
    }
    let budget = 40;
    let (text, _) = sim.assemble_context("system facts", budget, true);
    let token_count = text.split_whitespace().count();
    assert!(token_count <= budget, "rendered {token_count} tokens against a budget of {budget}");
}

#[test]
fn assemble_context_is_deterministic_for_a_fixed_state() {
    let mut sim = Simulacrum::new("session", 50, 0.9);
    sim.add_learning("Project uses Python", "project", 0.8).unwrap();
    sim.add_learning("Prefer f-strings", "pattern", 0.6).unwrap();
    sim.set_focus("python", 0.7);

    let (text1, result1) = sim.assemble_context("python facts", 500, true);
    let (text2, result2) = sim.assemble_context("python facts", 500, true);

    assert_eq!(text1, text2);
    assert_eq!(result1.learnings.len(), result2.learnings.len());
    for ((l1, s1), (l2, s2)) in result1.learnings.iter().zip(result2.learnings.iter()) {
        assert_eq!(l1.id, l2.id);
        assert!((s1 - s2).abs() < f32::EPSILON);
    }
}

#[test]
fn switching_models_discards_nothing() {
    let mut sim = Simulacrum::new("session", 50, 0.9);
    sim.add_user_message("hello");
    sim.add_learning("a fact", "project", 0.5).unwrap();
    sim.switch_model("model-a".to_string());
    sim.switch_model("model-b".to_string());

    assert_eq!(sim.current_model(), Some("model-b"));
    assert_eq!(sim.models_used(), &["model-a".to_string()]);
    assert_eq!(sim.long_term().active().len(), 1);
}
