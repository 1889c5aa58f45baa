//! Rule-based report for the sensory profile questionnaire.
//!
//! Each section holds named sub-scales. A sub-scale is a fixed set of
//! `(block, question)` items reduced to one value, and it contributes its
//! guidance paragraph when that value exceeds the sub-scale threshold.
//! A section where no sub-scale fires shows its balanced line instead.

use crate::questionnaire::definition::Locale;
use crate::questionnaire::session::Answers;

/// Text available in every supported locale.
#[derive(Debug, Clone, Copy)]
pub struct LocalizedText {
    pub ru: &'static str,
    pub en: &'static str,
}

impl LocalizedText {
    pub fn get(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::Ru => self.ru,
            Locale::En => self.en,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// Arithmetic mean of the recorded items.
    Mean,
    /// Raw value of a one-question sub-scale.
    Single,
}

#[derive(Debug, Clone, Copy)]
pub struct Subscale {
    pub id: &'static str,
    pub items: &'static [(usize, usize)],
    pub reducer: Reducer,
    pub threshold: f64,
    pub guidance: LocalizedText,
}

impl Subscale {
    /// Reduces the recorded items; `None` when none of them was answered.
    pub fn value(&self, answers: &Answers) -> Option<f64> {
        let values: Vec<f64> = self
            .items
            .iter()
            .filter_map(|&(block, question)| answers.get(block, question))
            .collect();

        match self.reducer {
            Reducer::Single => values.first().copied(),
            Reducer::Mean if values.is_empty() => None,
            Reducer::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub id: &'static str,
    pub title: LocalizedText,
    pub subscales: &'static [Subscale],
    pub balanced: LocalizedText,
}

const PAIRED_THRESHOLD: f64 = 2.5;
const THRESHOLD: f64 = 2.0;

static SECTIONS: &[Section] = &[
    Section {
        id: "auditory",
        title: LocalizedText { ru: "Слух", en: "Hearing" },
        subscales: &[
            Subscale {
                id: "auditory_avoidance",
                items: &[(0, 0), (0, 1)],
                reducer: Reducer::Mean,
                threshold: PAIRED_THRESHOLD,
                guidance: LocalizedText {
                    ru: "Шумные места быстро утомляют вас. Планируйте паузы в тишине, используйте беруши или наушники с шумоподавлением.",
                    en: "Noisy places drain you quickly. Plan quiet breaks and keep earplugs or noise-cancelling headphones at hand.",
                },
            },
            Subscale {
                id: "auditory_sensitivity",
                items: &[(0, 2), (0, 3), (0, 4)],
                reducer: Reducer::Mean,
                threshold: THRESHOLD,
                guidance: LocalizedText {
                    ru: "Вы замечаете звуки, которые другие пропускают. Старайтесь выбирать для работы помещения с ровным звуковым фоном.",
                    en: "You notice sounds others miss. Prefer working spaces with a steady, low background sound.",
                },
            },
            Subscale {
                id: "auditory_registration",
                items: &[(0, 5)],
                reducer: Reducer::Single,
                threshold: THRESHOLD,
                guidance: LocalizedText {
                    ru: "Вы можете не услышать, когда к вам обращаются. Договоритесь с близкими о визуальном сигнале перед разговором.",
                    en: "You may miss being spoken to. Agree on a visual cue with people close to you before they start talking.",
                },
            },
        ],
        balanced: LocalizedText {
            ru: "Слуховая чувствительность сбалансирована.",
            en: "Your auditory processing is balanced.",
        },
    },
    Section {
        id: "visual",
        title: LocalizedText { ru: "Зрение", en: "Vision" },
        subscales: &[
            Subscale {
                id: "visual_sensitivity",
                items: &[(0, 6), (0, 7), (0, 8)],
                reducer: Reducer::Mean,
                threshold: THRESHOLD,
                guidance: LocalizedText {
                    ru: "Яркий свет и визуальный беспорядок перегружают вас. Приглушайте освещение и убирайте лишнее из поля зрения.",
                    en: "Bright light and visual clutter overload you. Dim the lights and keep your field of view tidy.",
                },
            },
            Subscale {
                id: "visual_seeking",
                items: &[(0, 9)],
                reducer: Reducer::Single,
                threshold: THRESHOLD,
                guidance: LocalizedText {
                    ru: "Вам нужна визуальная стимуляция. Цвет, движение и смена обстановки помогают сохранять концентрацию.",
                    en: "You seek visual stimulation. Colour, movement and a change of scenery help you stay focused.",
                },
            },
        ],
        balanced: LocalizedText {
            ru: "Зрительная чувствительность сбалансирована.",
            en: "Your visual processing is balanced.",
        },
    },
    Section {
        id: "touch",
        title: LocalizedText { ru: "Прикосновения", en: "Touch" },
        subscales: &[
            Subscale {
                id: "touch_sensitivity",
                items: &[(0, 10), (0, 11), (0, 12)],
                reducer: Reducer::Mean,
                threshold: THRESHOLD,
                guidance: LocalizedText {
                    ru: "Неожиданные прикосновения и некоторые ткани вызывают дискомфорт. Выбирайте мягкую одежду без бирок и предупреждайте близких.",
                    en: "Unexpected touch and some fabrics feel uncomfortable. Choose soft, tagless clothing and let people know.",
                },
            },
            Subscale {
                id: "touch_seeking",
                items: &[(0, 13)],
                reducer: Reducer::Single,
                threshold: THRESHOLD,
                guidance: LocalizedText {
                    ru: "Тактильные ощущения помогают вам успокоиться. Держите под рукой предметы с приятной текстурой.",
                    en: "Touch helps you settle. Keep objects with a pleasant texture within reach.",
                },
            },
        ],
        balanced: LocalizedText {
            ru: "Тактильная чувствительность сбалансирована.",
            en: "Your tactile processing is balanced.",
        },
    },
    Section {
        id: "movement",
        title: LocalizedText { ru: "Движение", en: "Movement" },
        subscales: &[
            Subscale {
                id: "movement_sensitivity",
                items: &[(0, 14), (0, 15)],
                reducer: Reducer::Mean,
                threshold: THRESHOLD,
                guidance: LocalizedText {
                    ru: "Быстрое движение и высота могут вызывать тревогу. Двигайтесь в своём темпе и избегайте резких смен положения.",
                    en: "Fast motion and heights may feel unsettling. Move at your own pace and avoid sudden changes of position.",
                },
            },
            Subscale {
                id: "movement_seeking",
                items: &[(0, 16), (0, 17)],
                reducer: Reducer::Mean,
                threshold: THRESHOLD,
                guidance: LocalizedText {
                    ru: "Движение вас заряжает. Встраивайте короткие активные перерывы в течение дня.",
                    en: "Movement energises you. Build short active breaks into your day.",
                },
            },
        ],
        balanced: LocalizedText {
            ru: "Чувствительность к движению сбалансирована.",
            en: "Your movement processing is balanced.",
        },
    },
    Section {
        id: "taste_smell",
        title: LocalizedText { ru: "Вкус и запах", en: "Taste and smell" },
        subscales: &[
            Subscale {
                id: "taste_smell_sensitivity",
                items: &[(0, 18), (0, 19), (0, 20)],
                reducer: Reducer::Mean,
                threshold: THRESHOLD,
                guidance: LocalizedText {
                    ru: "Резкие запахи и непривычная еда даются вам тяжело. Это нормально: планируйте меню и проветривайте помещения.",
                    en: "Strong smells and unfamiliar food are hard for you. Plan your meals and keep rooms well aired.",
                },
            },
            Subscale {
                id: "taste_smell_seeking",
                items: &[(0, 21)],
                reducer: Reducer::Single,
                threshold: THRESHOLD,
                guidance: LocalizedText {
                    ru: "Вы ищете яркие вкусы и ароматы. Используйте их как способ переключиться и восстановиться.",
                    en: "You seek intense tastes and scents. Use them deliberately to reset and recharge.",
                },
            },
        ],
        balanced: LocalizedText {
            ru: "Вкусовая и обонятельная чувствительность сбалансирована.",
            en: "Your taste and smell processing is balanced.",
        },
    },
    Section {
        id: "registration",
        title: LocalizedText { ru: "Регистрация стимулов", en: "Registration" },
        subscales: &[Subscale {
            id: "low_registration",
            items: &[(0, 22), (0, 23), (0, 24)],
            reducer: Reducer::Mean,
            threshold: THRESHOLD,
            guidance: LocalizedText {
                ru: "Вы можете пропускать сигналы окружения. Напоминания, списки и будильники помогут ничего не упустить.",
                en: "You may miss cues from your surroundings. Reminders, lists and alarms help you keep track.",
            },
        }],
        balanced: LocalizedText {
            ru: "Восприятие сигналов окружения сбалансировано.",
            en: "You register cues from your surroundings in a balanced way.",
        },
    },
];

static REPORT_TITLE: LocalizedText = LocalizedText {
    ru: "Тест завершен\n\nПрофиль чувствительности:",
    en: "Test finished\n\nSensory profile:",
};

/// Computed value of one sub-scale.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscaleOutcome {
    pub id: &'static str,
    pub value: Option<f64>,
    pub triggered: bool,
}

#[derive(Debug, Clone)]
pub struct SectionOutcome {
    pub section: &'static Section,
    pub subscales: Vec<SubscaleOutcome>,
}

impl SectionOutcome {
    pub fn is_balanced(&self) -> bool {
        !self.subscales.iter().any(|s| s.triggered)
    }

    /// Guidance paragraphs in declared sub-scale order, or the balanced line.
    pub fn paragraphs(&self, locale: Locale) -> Vec<&'static str> {
        if self.is_balanced() {
            return vec![self.section.balanced.get(locale)];
        }
        self.section
            .subscales
            .iter()
            .zip(&self.subscales)
            .filter(|(_, outcome)| outcome.triggered)
            .map(|(subscale, _)| subscale.guidance.get(locale))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SensoryReport {
    pub sections: Vec<SectionOutcome>,
}

impl SensoryReport {
    pub fn render(&self, locale: Locale) -> String {
        let mut out = String::from(REPORT_TITLE.get(locale));
        for outcome in &self.sections {
            out.push_str("\n\n");
            out.push_str(outcome.section.title.get(locale));
            out.push(':');
            for paragraph in outcome.paragraphs(locale) {
                out.push('\n');
                out.push_str(paragraph);
            }
        }
        out
    }

    pub fn subscale(&self, id: &str) -> Option<&SubscaleOutcome> {
        self.sections
            .iter()
            .flat_map(|s| &s.subscales)
            .find(|s| s.id == id)
    }
}

/// The standard section table.
pub fn sections() -> &'static [Section] {
    SECTIONS
}

pub fn evaluate(answers: &Answers) -> SensoryReport {
    evaluate_with(SECTIONS, answers)
}

pub fn evaluate_with(sections: &'static [Section], answers: &Answers) -> SensoryReport {
    let sections = sections
        .iter()
        .map(|section| SectionOutcome {
            section,
            subscales: section
                .subscales
                .iter()
                .map(|subscale| {
                    let value = subscale.value(answers);
                    SubscaleOutcome {
                        id: subscale.id,
                        value,
                        triggered: value.is_some_and(|v| v > subscale.threshold),
                    }
                })
                .collect(),
        })
        .collect();

    SensoryReport { sections }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_reducer_takes_raw_value() {
        let mut answers = Answers::new();
        answers.record(0, 5, 3.0);
        let report = evaluate(&answers);
        let outcome = report.subscale("auditory_registration").unwrap();
        assert_eq!(outcome.value, Some(3.0));
        assert!(outcome.triggered);
    }

    #[test]
    fn test_unanswered_subscale_never_triggers() {
        let report = evaluate(&Answers::new());
        assert!(report.sections.iter().all(SectionOutcome::is_balanced));
        assert!(report.sections.iter().flat_map(|s| &s.subscales).all(|s| s.value.is_none()));
    }

    #[test]
    fn test_section_order_is_declared_order() {
        let ids: Vec<_> = evaluate(&Answers::new())
            .sections
            .iter()
            .map(|s| s.section.id)
            .collect();
        assert_eq!(
            ids,
            vec!["auditory", "visual", "touch", "movement", "taste_smell", "registration"]
        );
    }
}
