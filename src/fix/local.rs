//! Offline per-type status rules and property fixes.
//!
//! These rules are independent of the IDS evaluation and exist for instant
//! feedback after an edit. Only walls and doors have local rules.

use crate::model::{Element, Scalar, Status};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

/// Property names accepted as a thermal performance value.
pub const THERMAL_KEYS: &[&str] = &["UValue", "ThermalTransmittance"];
/// Property names accepted as a fire resistance class.
pub const FIRE_KEYS: &[&str] = &["fireClass", "FireRating"];

/// Property key written when a thermal value is supplied.
pub const THERMAL_PROPERTY: &str = "UValue";
/// Property key written when a fire class is supplied.
pub const FIRE_PROPERTY: &str = "fireClass";

pub(crate) fn has_thermal(element: &Element) -> bool {
    element.find_prop(THERMAL_KEYS).is_some()
}

pub(crate) fn has_fire_class(element: &Element) -> bool {
    element.find_prop(FIRE_KEYS).is_some()
}

/// Status from the fixed per-type rules.
#[must_use]
pub fn local_status(element: &Element) -> Status {
    match element.element_type.as_str() {
        "Wall" => match (has_thermal(element), has_fire_class(element)) {
            (false, false) => Status::Fail,
            (true, true) => Status::Pass,
            _ => Status::Warn,
        },
        "Door" if !has_fire_class(element) => Status::Warn,
        _ => Status::Pass,
    }
}

/// Returns a copy of `elements` with `property` set on the element `id` and
/// its local status recomputed. Unknown ids leave the copy unchanged.
#[must_use]
pub fn apply_suggestion(elements: &[Element], id: &str, property: &str, value: &Scalar) -> Vec<Element> {
    elements
        .iter()
        .map(|element| {
            if element.id != id {
                return element.clone();
            }
            let mut updated = element.clone();
            updated.props.insert(property.to_string(), value.clone());
            let status = local_status(&updated);
            updated.with_status(status)
        })
        .collect()
}

/// Asks the user for a single value.
pub trait Prompter {
    /// `None` when the user gave no answer.
    fn prompt(&mut self, message: &str) -> Option<String>;
}

/// Prompts on a writer and reads one line per answer.
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn prompt(&mut self, message: &str) -> Option<String> {
        write!(self.output, "{message} ").ok()?;
        self.output.flush().ok()?;

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()).filter(|l| !l.is_empty()),
        }
    }
}

/// Outcome of [`manual_fix`].
#[derive(Debug, Clone, PartialEq)]
pub struct ManualFix {
    pub props: BTreeMap<String, Scalar>,
    /// True when at least one value was supplied.
    pub fixed: bool,
}

/// Prompts once for each missing value the local rules look for.
///
/// Properties already present are never touched. A thermal value must parse
/// as a number; anything else counts as no answer.
pub fn manual_fix(element: &Element, prompter: &mut dyn Prompter) -> ManualFix {
    let mut props = element.props.clone();
    let mut fixed = false;

    let (ask_thermal, fire_prompt) = match element.element_type.as_str() {
        "Wall" => (!has_thermal(element), "Enter Fire Class (e.g., F30, F60, F90):"),
        "Door" => (false, "Enter Fire Class for door (e.g., F30, F60):"),
        _ => return ManualFix { props, fixed },
    };

    if ask_thermal {
        let answer = prompter.prompt("Enter U-Value for wall (e.g., 0.25):");
        match answer.as_deref().map(str::parse::<f64>) {
            Some(Ok(value)) if value.is_finite() => {
                props.insert(THERMAL_PROPERTY.to_string(), Scalar::Number(value));
                fixed = true;
            }
            Some(_) => tracing::warn!(guid = %element.guid, "Ignoring non-numeric U-Value"),
            None => {}
        }
    }

    if !has_fire_class(element) {
        if let Some(class) = prompter.prompt(fire_prompt) {
            props.insert(FIRE_PROPERTY.to_string(), Scalar::Text(class));
            fixed = true;
        }
    }

    ManualFix { props, fixed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;

    struct Answers {
        answers: VecDeque<Option<&'static str>>,
        asked: Vec<String>,
    }

    impl Answers {
        fn new(answers: Vec<Option<&'static str>>) -> Self {
            Self {
                answers: answers.into(),
                asked: Vec::new(),
            }
        }
    }

    impl Prompter for Answers {
        fn prompt(&mut self, message: &str) -> Option<String> {
            self.asked.push(message.to_string());
            self.answers.pop_front().flatten().map(str::to_string)
        }
    }

    fn element(kind: &str, props: &[(&str, Scalar)]) -> Element {
        let props = props
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        Element::new(format!("{kind}-1"), kind, props)
    }

    #[test]
    fn wall_rules() {
        assert_eq!(local_status(&element("Wall", &[])), Status::Fail);
        assert_eq!(
            local_status(&element("Wall", &[("UValue", Scalar::Number(0.25))])),
            Status::Warn
        );
        assert_eq!(
            local_status(&element(
                "Wall",
                &[
                    ("Pset_WallCommon.ThermalTransmittance", Scalar::Number(0.24)),
                    ("Pset_WallCommon.FireRating", Scalar::from("F90")),
                ]
            )),
            Status::Pass
        );
    }

    #[test]
    fn door_and_other_rules() {
        assert_eq!(local_status(&element("Door", &[])), Status::Warn);
        assert_eq!(
            local_status(&element("Door", &[("fireClass", Scalar::from("F30"))])),
            Status::Pass
        );
        assert_eq!(local_status(&element("Slab", &[])), Status::Pass);
    }

    #[test]
    fn apply_suggestion_updates_only_target() {
        let elements = vec![element("Wall", &[]), element("Door", &[])];
        let updated = apply_suggestion(&elements, "Wall-1", "fireClass", &Scalar::from("F60"));

        assert_eq!(updated[0].props.get("fireClass"), Some(&Scalar::from("F60")));
        assert_eq!(updated[0].status, Status::Warn);
        assert_eq!(updated[1], elements[1]);
        assert!(elements[0].props.is_empty());
    }

    #[test]
    fn apply_suggestion_is_idempotent_and_ignores_unknown_ids() {
        let elements = vec![element("Wall", &[])];
        let once = apply_suggestion(&elements, "Wall-1", "UValue", &Scalar::Number(0.18));
        let twice = apply_suggestion(&once, "Wall-1", "UValue", &Scalar::Number(0.18));
        assert_eq!(once, twice);

        assert_eq!(apply_suggestion(&elements, "nope", "UValue", &Scalar::Number(0.18)), elements);
    }

    #[test]
    fn manual_fix_prompts_for_missing_wall_values() {
        let wall = element("Wall", &[]);
        let mut answers = Answers::new(vec![Some("0.3"), Some("F90")]);
        let fix = manual_fix(&wall, &mut answers);

        assert!(fix.fixed);
        assert_eq!(fix.props.get("UValue"), Some(&Scalar::Number(0.3)));
        assert_eq!(fix.props.get("fireClass"), Some(&Scalar::from("F90")));
        assert_eq!(answers.asked.len(), 2);
    }

    #[test]
    fn manual_fix_skips_present_values_and_rejects_bad_numbers() {
        let wall = element("Wall", &[("FireRating", Scalar::from("F30"))]);
        let mut answers = Answers::new(vec![Some("thick")]);
        let fix = manual_fix(&wall, &mut answers);

        assert!(!fix.fixed);
        assert_eq!(fix.props, wall.props);
        assert_eq!(answers.asked, vec!["Enter U-Value for wall (e.g., 0.25):"]);
    }

    #[test]
    fn manual_fix_on_door_and_other_types() {
        let mut none = Answers::new(vec![None]);
        assert!(!manual_fix(&element("Door", &[]), &mut none).fixed);

        let mut unused = Answers::new(Vec::new());
        assert!(!manual_fix(&element("Window", &[]), &mut unused).fixed);
        assert!(unused.asked.is_empty());
    }

    #[test]
    fn line_prompter_reads_trimmed_lines() {
        let input = b"  F60 \n\n".as_slice();
        let mut output = Vec::new();
        let mut prompter = LinePrompter::new(input, &mut output);

        assert_eq!(prompter.prompt("Class?"), Some("F60".to_string()));
        assert_eq!(prompter.prompt("Again?"), None);
        assert_eq!(prompter.prompt("EOF?"), None);
        drop(prompter);
        assert_eq!(String::from_utf8(output).unwrap(), "Class? Again? EOF? ");
    }
}
