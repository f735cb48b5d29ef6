//! Benchmark for style resolution performance
//!
//! Target: a full-screen resolution pass (50 buttons) should complete in
//! well under one runtime tick (16ms).

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::Value;

use hmi_style_core::runtime::{ButtonRuntime, TagStore};
use hmi_style_core::style::{ConditionalStyle, ConditionalStyleManager};
use hmi_style_core::tag::{DataType, TagSnapshot, TagValue};
use hmi_style_core::trigger::{CompareOp, Operand, Trigger};

/// Create a manager with a realistic mix of trigger and expression rules
fn create_test_manager(rule_count: usize) -> ConditionalStyleManager {
    let mut manager = ConditionalStyleManager::new();

    for i in 0..rule_count {
        let mut style = ConditionalStyle {
            style_id: format!("rule_{}", i),
            priority: (i % 5) as i32,
            ..Default::default()
        };
        style.properties.background_color = format!("#{:06x}", i * 0x111111 % 0xffffff);

        if i % 3 == 0 {
            // Expression rule
            style.condition = Some(format!("level > {} and running", i * 10));
        } else {
            // Structured range rule
            style.trigger = Trigger::Range {
                operand1: Some(Operand::tag(Some("Plant"), "Level", Some(DataType::Real))),
                operator: if i % 2 == 0 {
                    CompareOp::Between
                } else {
                    CompareOp::Greater
                },
                operand2: Some(Operand::constant(TagValue::Int((i * 10) as i64))),
                lower_bound: Some(Operand::constant(TagValue::Int((i * 5) as i64))),
                upper_bound: Some(Operand::constant(TagValue::Int((i * 5 + 20) as i64))),
            };
        }
        manager.add_style(style);
    }

    manager
        .default_style
        .insert("background_color".to_string(), Value::from("#5a6270"));
    manager
}

fn create_test_snapshot() -> TagSnapshot {
    let mut snapshot = TagSnapshot::new();
    snapshot.insert("[Plant]::Level", TagValue::Real(42.0));
    snapshot.insert("level", TagValue::Real(42.0));
    snapshot.insert("running", TagValue::Bool(true));
    snapshot
}

fn benchmark_get_active_style(c: &mut Criterion) {
    let manager = create_test_manager(20);
    let snapshot = create_test_snapshot();

    // Warm the expression cache so the steady-state path is measured
    let _ = manager.get_active_style(&snapshot, None);

    c.bench_function("get_active_style_20_rules", |b| {
        b.iter(|| {
            let props = manager.get_active_style(black_box(&snapshot), None);
            black_box(props)
        })
    });
}

fn benchmark_expression_parsing(c: &mut Criterion) {
    let expressions = vec![
        "level > 5",
        "level > 5 and pressure < 10",
        "level > 5 or pressure < 10",
        "running and (level > 90 or pressure > 6.5) and not fault",
        "2 < level < 5",
    ];

    c.bench_function("expression_parsing_cold", |b| {
        b.iter(|| {
            hmi_style_core::expr::clear_cache();
            for expr in &expressions {
                let _ = black_box(hmi_style_core::expr::get_or_parse(expr));
            }
        })
    });

    c.bench_function("expression_parsing_cached", |b| {
        // Warm up cache
        for expr in &expressions {
            let _ = hmi_style_core::expr::get_or_parse(expr);
        }

        b.iter(|| {
            for expr in &expressions {
                let _ = black_box(hmi_style_core::expr::get_or_parse(expr));
            }
        })
    });
}

fn benchmark_screen_resolution(c: &mut Criterion) {
    // 50 buttons, each with a handful of conditional styles and an action
    let button_config: Value = serde_json::json!({
        "label": "Pump",
        "background_color": "#202833",
        "conditional_styles": [
            {
                "style_id": "running",
                "priority": 5,
                "condition_data": {
                    "mode": "On",
                    "operand1": {"source": "tag", "value": {"tag_name": "Run", "db_name": "Plant", "data_type": "BOOL"}}
                },
                "properties": {"background_color": "#00aa00"}
            },
            {
                "style_id": "alarm",
                "priority": 9,
                "condition": "level > 90",
                "properties": {"background_color": "#ff0000"},
                "tooltip": "High level"
            }
        ],
        "actions": [
            {
                "action_type": "bit",
                "mode": "Alternate",
                "target_tag": {"source": "tag", "value": {"tag_name": "Run", "db_name": "Plant", "data_type": "BOOL"}}
            }
        ]
    });
    let properties = match button_config {
        Value::Object(map) => map,
        _ => unreachable!(),
    };

    let buttons: Vec<ButtonRuntime> = (0..50)
        .map(|_| ButtonRuntime::from_properties(&properties))
        .collect();

    let mut store = TagStore::new();
    store.set("[Plant]::Run", TagValue::Bool(true));
    store.set("level", TagValue::Real(95.0));

    c.bench_function("screen_resolution_50_buttons", |b| {
        b.iter(|| {
            for button in &buttons {
                let props = button.resolved_style(black_box(&store), None);
                black_box(props);
            }
        })
    });

    c.bench_function("button_runtime_construction", |b| {
        b.iter(|| {
            let runtime = ButtonRuntime::from_properties(black_box(&properties));
            black_box(runtime)
        })
    });
}

criterion_group!(
    benches,
    benchmark_get_active_style,
    benchmark_expression_parsing,
    benchmark_screen_resolution
);
criterion_main!(benches);
