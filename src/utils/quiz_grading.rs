use std::collections::HashMap;

/// Correct option index for one question, keyed by question id.
#[derive(Debug, Clone, Copy)]
pub struct AnswerKey {
    pub question_id: u64,
    pub correct_option: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradedAttempt {
    pub total_questions: u32,
    pub correct_count: u32,
    /// 0-100, rounded.
    pub score: u32,
}

/// Grades one attempt against the quiz answer key.
///
/// Unanswered questions count as wrong; submitted answers for unknown
/// question ids are ignored. An empty quiz grades to zero.
pub fn grade_attempt(key: &[AnswerKey], answers: &HashMap<u64, u32>) -> GradedAttempt {
    let total_questions = key.len() as u32;
    let correct_count = key
        .iter()
        .filter(|q| answers.get(&q.question_id) == Some(&q.correct_option))
        .count() as u32;

    let score = if total_questions > 0 {
        ((correct_count as f64 / total_questions as f64) * 100.0).round() as u32
    } else {
        0
    };

    GradedAttempt {
        total_questions,
        correct_count,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(entries: &[(u64, u32)]) -> Vec<AnswerKey> {
        entries
            .iter()
            .map(|&(question_id, correct_option)| AnswerKey {
                question_id,
                correct_option,
            })
            .collect()
    }

    #[test]
    fn all_correct_scores_hundred() {
        let key = key(&[(1, 0), (2, 3), (3, 1)]);
        let answers = HashMap::from([(1, 0), (2, 3), (3, 1)]);
        let graded = grade_attempt(&key, &answers);
        assert_eq!(graded.correct_count, 3);
        assert_eq!(graded.total_questions, 3);
        assert_eq!(graded.score, 100);
    }

    #[test]
    fn partial_credit_rounds() {
        let key = key(&[(1, 0), (2, 1), (3, 2)]);
        let answers = HashMap::from([(1, 0), (2, 0), (3, 0)]);
        let graded = grade_attempt(&key, &answers);
        assert_eq!(graded.correct_count, 1);
        // 1/3 rounds to 33
        assert_eq!(graded.score, 33);
    }

    #[test]
    fn unanswered_questions_count_wrong() {
        let key = key(&[(1, 0), (2, 1)]);
        let answers = HashMap::from([(1, 0)]);
        let graded = grade_attempt(&key, &answers);
        assert_eq!(graded.correct_count, 1);
        assert_eq!(graded.score, 50);
    }

    #[test]
    fn unknown_question_ids_are_ignored() {
        let key = key(&[(1, 0)]);
        let answers = HashMap::from([(1, 0), (999, 2)]);
        let graded = grade_attempt(&key, &answers);
        assert_eq!(graded.correct_count, 1);
        assert_eq!(graded.total_questions, 1);
        assert_eq!(graded.score, 100);
    }

    #[test]
    fn empty_quiz_grades_zero() {
        let graded = grade_attempt(&[], &HashMap::new());
        assert_eq!(graded.total_questions, 0);
        assert_eq!(graded.score, 0);
    }
}
