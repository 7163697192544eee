// src/agent/prompts.rs — System prompts and turn framing

use crate::agent::session::Mode;
use crate::provider::{Block, Turn};

/// System prompt for the evaluation conversation. The ```json contract
/// here must stay in sync with parser::parse_evaluation.
pub const EVAL_SYSTEM: &str = r#"You are an expert OpenSCAD 3D design evaluator. You review rendered PNG images of OpenSCAD designs alongside their source code and return structured assessments.

The single most important question is: does the render LOOK like the real object? A simple model with the right overall shape outranks a detailed model with wrong proportions. Judge the image first, the code second.

Score each criterion 1-10:

1. recognizability (weight 2x) — would someone know what this object is from the render alone? Is the silhouette right? 1-4 unrecognizable, 5-6 vaguely, 7-8 clearly, 9-10 photorealistic silhouette.
2. proportions (weight 2x) — do relative dimensions match the real object? Be strict; small proportion errors break realism.
3. visual_quality — clean render, smooth curves, no polygon artifacts, material-plausible colors, object in its iconic resting state.
4. structural — printable: sufficient wall thickness, no floating parts.
5. code_quality — parameters at the top ($fn, num_steps, wall_thickness), hull() instead of minkowski(), proper modules, snake_case, mm unit comments.

Overall score = (recognizability*2 + proportions*2 + visual_quality + structural + code_quality) / 7.

You MUST respond with a JSON block inside ```json fences:

```json
{
  "score": <1-10 integer, weighted average>,
  "summary": "<one-line assessment of overall form accuracy>",
  "criteria_scores": {
    "recognizability": <1-10>,
    "proportions": <1-10>,
    "visual_quality": <1-10>,
    "structural": <1-10>,
    "code_quality": <1-10>
  },
  "issues": ["<form/silhouette issues first, then proportions, then detail>"],
  "suggested_code": "<FULL replacement .scad source fixing every listed issue, or null ONLY when there are zero issues>",
  "stop_reason": "<'no_improvement' when further iteration cannot help, else null>"
}
```

Rules for suggested_code:
- Always provide it when ANY issue is listed, even at high scores; null means zero issues remain.
- Complete file, not a diff, and it must address every listed issue.
- Fix overall shape and proportions before details; show the object in its iconic resting state; skip hidden internal mechanisms.
- Never use minkowski(); use hull(). Keep $fn <= 60 and num_steps <= 50 for iterative previews. Inner difference() shapes must extend at least 1mm beyond the outer."#;

/// System prompt for initial source generation.
pub const GENERATE_SYSTEM: &str = r#"You are an expert OpenSCAD designer. Generate .scad files that produce realistic, instantly recognizable 3D models.

Silhouette first, details later: the overall shape and proportions must match the real object before any surface detail is added. Use real-world dimensions in mm, and show the object in its iconic resting state (a lighter closed, a car on its wheels).

File structure:
1. Block comment — description, real-world specs, printing tips.
2. Parameters — $fn = 60, num_steps = 50, wall_thickness = 2, then model-specific values, all in mm with comments.
3. Modules — one per visible external part (3-6 of them; no hidden mechanisms).
4. Assembly — final composition with color().

Technical rules:
- Never use minkowski(); hull() four cylinders for a rounded box, hull() eight spheres for a fully rounded body.
- Inner difference() shapes extend at least 1mm beyond the outer.
- Prefer solid geometry; hollow out only visible cavities.
- snake_case names, no magic numbers.

Return ONLY the .scad source inside ```openscad fences, no other text."#;

/// Instruction text for the first evaluation turn, by mode.
pub fn initial_instruction(mode: Mode, description: &str) -> String {
    match mode {
        Mode::Review => "Review this OpenSCAD design. Evaluate the rendered image and the code. \
                         Suggest improvements to make the design more realistic, properly \
                         proportioned, and following best practices."
            .to_string(),
        Mode::Generate => format!(
            "I generated this OpenSCAD design based on the description: \"{description}\". \
             Evaluate how well the rendered image matches the description. Suggest \
             improvements to geometry, proportions, detail, and code quality."
        ),
    }
}

/// Instruction text for every later iteration.
pub fn followup_instruction(iteration: u32) -> String {
    format!("Iteration {iteration}: here is the updated render and code after your previous suggestions.")
}

/// Assemble the user turn for one evaluation iteration: instruction
/// (plus optional user feedback), rendered image, current source.
pub fn evaluation_turn(
    instruction: &str,
    png: &[u8],
    current_code: &str,
    feedback: Option<&str>,
) -> Turn {
    let mut text = instruction.to_string();
    if let Some(feedback) = feedback {
        text.push_str("\n\nUser feedback: ");
        text.push_str(feedback);
    }

    Turn::user(vec![
        Block::text(text),
        Block::png(png),
        Block::text(format!(
            "Current .scad code:\n```openscad\n{current_code}\n```"
        )),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_instruction_by_mode() {
        let review = initial_instruction(Mode::Review, "ignored");
        assert!(review.starts_with("Review this OpenSCAD design"));

        let generate = initial_instruction(Mode::Generate, "a vintage lighter");
        assert!(generate.contains("\"a vintage lighter\""));
    }

    #[test]
    fn test_followup_instruction_numbers_iterations() {
        assert!(followup_instruction(3).starts_with("Iteration 3:"));
    }

    #[test]
    fn test_evaluation_turn_layout() {
        let turn = evaluation_turn("look at this", &[1, 2, 3], "cube(4);", None);
        assert_eq!(turn.blocks.len(), 3);
        assert!(matches!(turn.blocks[0], Block::Text { .. }));
        assert!(matches!(turn.blocks[1], Block::Image { .. }));
        match &turn.blocks[2] {
            Block::Text { text } => assert!(text.contains("cube(4);")),
            other => panic!("expected code block, got {other:?}"),
        }
    }

    #[test]
    fn test_evaluation_turn_includes_feedback() {
        let turn = evaluation_turn("instruction", &[], "cube(1);", Some("make it taller"));
        match &turn.blocks[0] {
            Block::Text { text } => {
                assert!(text.contains("User feedback: make it taller"));
            }
            other => panic!("expected text block, got {other:?}"),
        }
    }

    #[test]
    fn test_eval_system_contract_keys() {
        // The parser depends on these exact key names.
        for key in [
            "\"score\"",
            "\"summary\"",
            "\"criteria_scores\"",
            "\"recognizability\"",
            "\"proportions\"",
            "\"visual_quality\"",
            "\"structural\"",
            "\"code_quality\"",
            "\"issues\"",
            "\"suggested_code\"",
            "\"stop_reason\"",
        ] {
            assert!(EVAL_SYSTEM.contains(key), "missing {key} in EVAL_SYSTEM");
        }
        assert!(EVAL_SYSTEM.contains("no_improvement"));
    }
}
