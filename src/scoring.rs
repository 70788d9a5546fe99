// src/scoring.rs

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::submission::AnswerSet;

/// Counts answers that match the answer key exactly.
///
/// Only ids present in `answer_key` can score, so unknown or unanswered
/// questions contribute nothing and the result never exceeds the key size.
pub fn score_answers(answers: &AnswerSet, answer_key: &HashMap<Uuid, String>) -> i32 {
    let correct = answers
        .iter()
        .filter(|(q_id, user_ans)| {
            answer_key
                .get(*q_id)
                .is_some_and(|correct| *user_ans == correct)
        })
        .count();

    i32::try_from(correct).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_of_two_correct() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();

        let key = HashMap::from([(q1, "B".to_string()), (q2, "C".to_string())]);
        let answers = AnswerSet::from([(q1, "B".to_string()), (q2, "D".to_string())]);

        assert_eq!(score_answers(&answers, &key), 1);
    }

    #[test]
    fn unknown_questions_do_not_score() {
        let q1 = Uuid::new_v4();
        let key = HashMap::from([(q1, "A".to_string())]);
        let answers = AnswerSet::from([(Uuid::new_v4(), "A".to_string())]);

        assert_eq!(score_answers(&answers, &key), 0);
    }

    #[test]
    fn empty_answers_score_zero() {
        let key = HashMap::from([(Uuid::new_v4(), "A".to_string())]);
        assert_eq!(score_answers(&AnswerSet::new(), &key), 0);
    }

    #[test]
    fn comparison_is_exact() {
        let q1 = Uuid::new_v4();
        let key = HashMap::from([(q1, "Ganga".to_string())]);
        let answers = AnswerSet::from([(q1, "ganga".to_string())]);

        assert_eq!(score_answers(&answers, &key), 0);
    }

    #[test]
    fn score_never_exceeds_key_size() {
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let key: HashMap<Uuid, String> = ids.iter().map(|id| (*id, "A".to_string())).collect();
        let mut answers: AnswerSet = ids.iter().map(|id| (*id, "A".to_string())).collect();
        for _ in 0..5 {
            answers.insert(Uuid::new_v4(), "A".to_string());
        }

        let score = score_answers(&answers, &key);
        assert!((0..=key.len() as i32).contains(&score));
        assert_eq!(score, 5);
    }
}
