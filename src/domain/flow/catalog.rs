//! 步骤目录
//!
//! 静态、有序、不可变；整个表单生命周期内通过 `Arc` 共享

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use super::{AnswerSet, CatalogError, StepDefinition, StepId, StepKind, StepOption, Visibility};

/// TOML 目录文件结构
#[derive(Debug, Deserialize, Serialize)]
struct CatalogFile {
    steps: Vec<StepDefinition>,
}

/// 步骤目录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepCatalog {
    steps: Vec<StepDefinition>,
}

impl StepCatalog {
    /// 创建并校验目录
    ///
    /// 不变量:
    /// - 至少一个步骤，ID 唯一
    /// - 选择类步骤必须有选项
    /// - 可见性条件只能引用排在前面的步骤（保证步骤图无环）
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self, CatalogError> {
        if steps.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for step in &steps {
            if StepId::new(step.id.as_str()).is_err() {
                return Err(CatalogError::InvalidStepId(step.id.to_string()));
            }
            if let Some(depends_on) = step.visible_when.depends_on() {
                if !seen.contains(depends_on.as_str()) {
                    return Err(CatalogError::ForwardReference {
                        step: step.id.clone(),
                        depends_on: depends_on.clone(),
                    });
                }
            }
            if !seen.insert(step.id.as_str()) {
                return Err(CatalogError::DuplicateStep(step.id.clone()));
            }
            if step.kind.has_options() && step.options.is_empty() {
                return Err(CatalogError::MissingOptions(step.id.clone()));
            }
        }

        Ok(Self { steps })
    }

    /// 从 TOML 文本解析
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            toml::from_str(content).map_err(|e| CatalogError::ParseError(e.to_string()))?;
        Self::new(file.steps)
    }

    /// 从 TOML 文件加载
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::FileReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id.as_str() == id)
    }

    /// 计算当前可见步骤（保持目录顺序）
    pub fn compute_visible_steps(&self, answers: &AnswerSet) -> Vec<&StepDefinition> {
        self.steps.iter().filter(|s| s.is_visible(answers)).collect()
    }

    /// 可见步骤在目录中的下标
    pub(crate) fn visible_positions(&self, answers: &AnswerSet) -> Vec<usize> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_visible(answers))
            .map(|(i, _)| i)
            .collect()
    }

    /// 内置的 Tap In 生成表单
    pub fn tap_in_default() -> Self {
        let source = id("source");
        let steps = vec![
            StepDefinition::new(id("intro"), "Let's tap in", StepKind::Informational)
                .with_description(
                    "Answer a few questions and we'll craft an affirmation and a short guided meditation for you.",
                ),
            StepDefinition::new(source.clone(), "What brought you here today?", StepKind::SingleSelect)
                .with_options(vec![
                    StepOption::new("quick_shift", "Quick Shift - I'm stuck in a loop right now"),
                    StepOption::new("plot_twist", "Plot Twist - I'm working on today's quest"),
                ]),
            StepDefinition::new(id("loop"), "Which loop are you caught in?", StepKind::SingleSelect)
                .with_options(vec![
                    StepOption::new("overthinking", "Overthinking"),
                    StepOption::new("people_pleasing", "People pleasing"),
                    StepOption::new("self_doubt", "Self-doubt"),
                    StepOption::new("burnout", "Burnout"),
                ])
                .visible_when(Visibility::EqualsAnswer {
                    step: source.clone(),
                    value: "quick_shift".to_string(),
                }),
            StepDefinition::new(id("quest_response"), "How did today's quest land?", StepKind::SingleSelect)
                .with_options(vec![
                    StepOption::new("nailed_it", "I nailed it"),
                    StepOption::new("tried", "I tried, it was hard"),
                    StepOption::new("skipped", "I skipped it"),
                ])
                .visible_when(Visibility::EqualsAnswer {
                    step: source,
                    value: "plot_twist".to_string(),
                }),
            StepDefinition::new(id("feeling"), "How do you want to feel?", StepKind::SingleSelect)
                .with_options(vec![
                    StepOption::new("calm", "Calm"),
                    StepOption::new("grounded", "Grounded"),
                    StepOption::new("energized", "Energized"),
                    StepOption::new("peaceful", "Peaceful"),
                    StepOption::new("focused", "Focused"),
                ]),
            StepDefinition::new(id("imagery"), "Pick the scenes that soothe you", StepKind::MultiSelect)
                .with_options(vec![
                    StepOption::new("beach", "Beach"),
                    StepOption::new("forest", "Forest"),
                    StepOption::new("river", "River"),
                    StepOption::new("mountain", "Mountain"),
                    StepOption::new("night-sky", "Night sky"),
                ])
                .skippable(),
            StepDefinition::new(id("opening"), "Choose your opening phrase", StepKind::SingleSelect)
                .with_options(vec![
                    StepOption::new("i-am", "I am"),
                    StepOption::new("i-embrace", "I embrace"),
                    StepOption::new("i-trust", "I trust"),
                    StepOption::new("i-choose", "I choose"),
                    StepOption::new("i-create", "I create"),
                ]),
            StepDefinition::new(id("duration"), "How long should the meditation be?", StepKind::SingleSelect)
                .with_options(vec![
                    StepOption::new("3", "3 minutes"),
                    StepOption::new("4", "4 minutes"),
                    StepOption::new("5", "5 minutes"),
                ]),
            StepDefinition::new(id("context"), "Anything else on your mind?", StepKind::FreeText)
                .skippable(),
            StepDefinition::new(
                id("consent"),
                "I understand this is not a substitute for professional care",
                StepKind::SingleCheckbox,
            ),
        ];

        // 内置目录在测试中校验
        Self { steps }
    }
}

fn id(value: &'static str) -> StepId {
    StepId::from_static(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flow::AnswerValue;

    const BRANCH_CATALOG: &str = r#"
[[steps]]
id = "a"
title = "A"
kind = "single_select"
options = [{ value = "x", label = "X" }, { value = "y", label = "Y" }]

[[steps]]
id = "b"
title = "B"
kind = "free_text"
visible_when = { equals_answer = { step = "a", value = "x" } }

[[steps]]
id = "c"
title = "C"
kind = "informational"
"#;

    fn ids(steps: &[&StepDefinition]) -> Vec<String> {
        steps.iter().map(|s| s.id.to_string()).collect()
    }

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = StepCatalog::tap_in_default();
        assert!(StepCatalog::new(catalog.steps().to_vec()).is_ok());
        assert_eq!(catalog.steps()[0].kind, StepKind::Informational);
    }

    #[test]
    fn test_branching_scenario() {
        let catalog = StepCatalog::from_toml_str(BRANCH_CATALOG).unwrap();
        let mut answers = AnswerSet::new();

        answers.insert(StepId::new("a").unwrap(), AnswerValue::from("y"));
        assert_eq!(ids(&catalog.compute_visible_steps(&answers)), vec!["a", "c"]);

        answers.insert(StepId::new("a").unwrap(), AnswerValue::from("x"));
        assert_eq!(ids(&catalog.compute_visible_steps(&answers)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_visible_steps_preserve_catalog_order() {
        let catalog = StepCatalog::tap_in_default();
        let all: Vec<String> = catalog.steps().iter().map(|s| s.id.to_string()).collect();

        for source in ["quick_shift", "plot_twist", "unknown"] {
            let mut answers = AnswerSet::new();
            answers.insert(StepId::new("source").unwrap(), AnswerValue::from(source));
            let visible = ids(&catalog.compute_visible_steps(&answers));

            // visible 必须是 all 的子序列
            let mut cursor = all.iter();
            for step in &visible {
                assert!(cursor.any(|s| s == step), "{} out of order", step);
            }
        }
    }

    #[test]
    fn test_forward_reference_rejected() {
        let content = r#"
[[steps]]
id = "b"
title = "B"
kind = "free_text"
visible_when = { equals_answer = { step = "a", value = "x" } }

[[steps]]
id = "a"
title = "A"
kind = "free_text"
"#;
        assert!(matches!(
            StepCatalog::from_toml_str(content),
            Err(CatalogError::ForwardReference { .. })
        ));
    }

    #[test]
    fn test_duplicate_and_missing_options_rejected() {
        let duplicate = vec![
            StepDefinition::new(StepId::new("a").unwrap(), "A", StepKind::FreeText),
            StepDefinition::new(StepId::new("a").unwrap(), "A again", StepKind::FreeText),
        ];
        assert!(matches!(
            StepCatalog::new(duplicate),
            Err(CatalogError::DuplicateStep(_))
        ));

        let no_options = vec![StepDefinition::new(
            StepId::new("a").unwrap(),
            "A",
            StepKind::MultiSelect,
        )];
        assert!(matches!(
            StepCatalog::new(no_options),
            Err(CatalogError::MissingOptions(_))
        ));
        assert!(matches!(StepCatalog::new(vec![]), Err(CatalogError::Empty)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, BRANCH_CATALOG).unwrap();

        let catalog = StepCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.get("b").is_some());
    }
}
