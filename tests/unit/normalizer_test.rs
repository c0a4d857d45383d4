//! Unit tests for parameter normalization

use img_relay_gateway::error::ValidationError;
use img_relay_gateway::gateway::{normalize, GenerateParams};
use serde_json::{json, Value};

fn with_dims(width: Value, height: Value) -> GenerateParams {
    GenerateParams {
        width: Some(width),
        height: Some(height),
        ..GenerateParams::prompt("a lighthouse at dusk")
    }
}

#[test]
fn test_dimensions_are_multiples_of_16() {
    for x in (-100..3000).step_by(7) {
        let spec = normalize(&with_dims(json!(x), json!(x))).unwrap();
        assert_eq!(spec.width() % 16, 0, "width for input {}", x);
        assert!(spec.width() >= 16, "width for input {}", x);
        assert_eq!(spec.width(), spec.height());
    }
}

#[test]
fn test_dimension_examples() {
    let cases = [(1000, 1008), (5, 16), (1024, 1024), (520, 528), (8, 16), (24, 32)];
    for (input, expected) in cases {
        let spec = normalize(&with_dims(json!(input), json!(input))).unwrap();
        assert_eq!(spec.width(), expected, "input {}", input);
    }
}

#[test]
fn test_dimension_defaults() {
    let spec = normalize(&GenerateParams::prompt("x")).unwrap();
    assert_eq!((spec.width(), spec.height()), (1024, 1024));

    let spec = normalize(&with_dims(json!("wide"), json!(null))).unwrap();
    assert_eq!((spec.width(), spec.height()), (1024, 1024));
}

#[test]
fn test_dimension_from_strings() {
    let spec = normalize(&with_dims(json!("768"), json!("500px"))).unwrap();
    assert_eq!(spec.width(), 768);
    assert_eq!(spec.height(), 496);
}

#[test]
fn test_steps_and_count_are_clamped() {
    let inputs = [
        json!(-5),
        json!(0),
        json!(1),
        json!(2),
        json!(4),
        json!(5),
        json!(100),
        json!("3"),
        json!("lots"),
        json!(2.7),
        json!(false),
        json!({"n": 2}),
    ];

    for input in inputs {
        let params = GenerateParams {
            steps: Some(input.clone()),
            count: Some(input.clone()),
            ..GenerateParams::prompt("x")
        };
        let spec = normalize(&params).unwrap();
        assert!((1..=4).contains(&spec.steps()), "steps for {}", input);
        assert!((1..=4).contains(&spec.count()), "count for {}", input);
    }
}

#[test]
fn test_steps_and_count_defaults() {
    let spec = normalize(&GenerateParams::prompt("x")).unwrap();
    assert_eq!(spec.steps(), 3);
    assert_eq!(spec.count(), 1);

    let params = GenerateParams {
        steps: Some(json!(-2)),
        count: Some(json!(9)),
        ..GenerateParams::prompt("x")
    };
    let spec = normalize(&params).unwrap();
    assert_eq!(spec.steps(), 1);
    assert_eq!(spec.count(), 4);
}

#[test]
fn test_blank_prompts_rejected() {
    for prompt in ["", " ", "\t\n", "   \r\n  "] {
        assert_eq!(
            normalize(&GenerateParams::prompt(prompt)),
            Err(ValidationError::EmptyPrompt),
            "prompt {:?}",
            prompt
        );
    }

    assert_eq!(
        normalize(&GenerateParams::default()),
        Err(ValidationError::EmptyPrompt)
    );
}

#[test]
fn test_prompt_is_trimmed() {
    let spec = normalize(&GenerateParams::prompt("  a red fox \n")).unwrap();
    assert_eq!(spec.prompt(), "a red fox");
}

#[test]
fn test_cat_scenario() {
    let params = GenerateParams {
        prompt: Some(json!("cat")),
        width: Some(json!(1000)),
        height: Some(json!(1000)),
        steps: Some(json!(10)),
        count: Some(json!(10)),
    };
    let spec = normalize(&params).unwrap();

    assert_eq!(spec.prompt(), "cat");
    assert_eq!(spec.width(), 1008);
    assert_eq!(spec.height(), 1008);
    assert_eq!(spec.steps(), 4);
    assert_eq!(spec.count(), 4);
}
