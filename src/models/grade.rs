use serde::{Deserialize, Serialize};

/// A single grade entry as reported by the portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
    #[serde(default)]
    pub title: String,

    #[serde(alias = "subject")]
    pub subject_name: String,

    /// Points earned, when the grade is point-based
    #[serde(alias = "score")]
    pub grade_n: Option<f64>,

    pub max_points: Option<f64>,

    pub percent: Option<f64>,

    pub date: Option<String>,
}

impl Grade {
    /// Whether this grade should be shown as points out of a maximum
    /// rather than a percentage. Percentages only make sense on the
    /// conventional 100-point scale.
    pub fn is_point_based(&self) -> bool {
        self.max_points.is_some_and(|max| max != 100.0)
    }
}

/// Group grades by subject, preserving the order subjects first appear.
pub fn group_by_subject(grades: &[Grade]) -> Vec<(String, Vec<Grade>)> {
    let mut grouped: Vec<(String, Vec<Grade>)> = Vec::new();
    for grade in grades {
        match grouped.iter_mut().find(|(name, _)| *name == grade.subject_name) {
            Some((_, items)) => items.push(grade.clone()),
            None => grouped.push((grade.subject_name.clone(), vec![grade.clone()])),
        }
    }
    grouped
}
