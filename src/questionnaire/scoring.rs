use crate::questionnaire::definition::{Locale, QuestionnaireDefinition, ScoringPolicy};
use crate::questionnaire::sensory;
use crate::questionnaire::session::Answers;

/// Aggregate score stored with an attempt, if the policy has one.
pub fn aggregate_score(definition: &QuestionnaireDefinition, answers: &Answers) -> Option<f64> {
    match definition.kind.scoring() {
        ScoringPolicy::Sum => Some(answers.total()),
        ScoringPolicy::SensoryProfile => None,
    }
}

/// Renders the result message for a set of answers.
pub fn render_result(definition: &QuestionnaireDefinition, answers: &Answers) -> String {
    let locale = definition.kind.locale();
    match definition.kind.scoring() {
        ScoringPolicy::Sum => render_sum_report(definition, answers, locale),
        ScoringPolicy::SensoryProfile => sensory::evaluate(answers).render(locale),
    }
}

fn render_sum_report(definition: &QuestionnaireDefinition, answers: &Answers, locale: Locale) -> String {
    let (header, question_label, block_sum_label, total_label) = match locale {
        Locale::Ru => ("Тест завершен\n\nРезультаты:\n", "Вопрос", "Сумма баллов", "Итого"),
        Locale::En => ("Test finished\n\nResults:\n", "Question", "Score", "Total"),
    };

    let mut message = String::from(header);
    for (index, block) in definition.blocks.iter().enumerate() {
        message.push_str(&format!("{}:\n", block.name));
        for (question, weight) in answers.block(index) {
            message.push_str(&format!(
                "  {} {}: {}\n",
                question_label,
                question + 1,
                format_score(weight)
            ));
        }
        message.push_str(&format!(
            "{}: {}\n\n",
            block_sum_label,
            format_score(answers.block_total(index))
        ));
    }

    if definition.blocks.len() > 1 {
        message.push_str(&format!("{}: {}", total_label, format_score(answers.total())));
    }

    message.trim_end().to_string()
}

/// Whole numbers print without a fractional part.
pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{score:.0}")
    } else {
        let formatted = format!("{score:.2}");
        formatted.trim_end_matches('0').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(21.0), "21");
        assert_eq!(format_score(0.0), "0");
        assert_eq!(format_score(2.5), "2.5");
        assert_eq!(format_score(1.25), "1.25");
    }
}
