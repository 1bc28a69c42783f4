//! Plain-text screens. Every function here is pure so the console loop only
//! decides what to show, never how.

use crate::models::{Notice, NoticeLevel, Question, Score};
use crate::utils::time::format_countdown;

pub const NAME_PROMPT: &str = "Ismingizni kiriting:";
pub const CODE_PROMPT: &str = "Kirish kodini kiriting:";
pub const FINISH_CONFIRM_PROMPT: &str = "Testni yakunlamoqchimisiz? (ha/yo'q)";
pub const EXIT_PROMPT: &str = "Chiqish uchun Enter bosing.";

pub fn welcome() -> String {
    format!("=== Onlayn test ===\n{NAME_PROMPT}\n")
}

pub fn rules(question_limit: usize, budget_seconds: u32) -> String {
    format!(
        "\nQoidalar:\n\
         - Test {question_limit} ta savoldan iborat, vaqt: {} daqiqa.\n\
         - Har bir savolga bitta javob tanlanadi, javobni o'zgartirish mumkin.\n\
         - Oynadan chiqish qoidabuzarlik sifatida qayd etiladi.\n\
         - Vaqt tugaganda test avtomatik yakunlanadi.\n\
         Boshlash uchun Enter bosing.\n",
        budget_seconds / 60
    )
}

pub fn help() -> String {
    "Buyruqlar: raqam - javob tanlash, n - keyingi, p - oldingi, g N - N-savolga o'tish, t - tugatish\n"
        .to_string()
}

/// Running screen. `position` is zero-based; with no questions the header
/// reads `Savol 0 / 0` and no options are listed.
pub fn question(
    position: usize,
    total: usize,
    question: Option<&Question>,
    chosen: Option<&str>,
    remaining_seconds: u32,
) -> String {
    let shown = if total == 0 { 0 } else { position + 1 };
    let mut out = format!(
        "\nSavol {shown} / {total}    Qolgan vaqt: {}\n",
        format_countdown(remaining_seconds)
    );

    match question {
        Some(q) => {
            out.push_str(&q.prompt);
            out.push('\n');
            for (i, option) in q.options.iter().enumerate() {
                let mark = if chosen == Some(option.as_str()) {
                    "[x]"
                } else {
                    "[ ]"
                };
                out.push_str(&format!("  {mark} {}) {option}\n", i + 1));
            }
        }
        None => out.push_str("Savollar mavjud emas.\n"),
    }

    out.push_str(&help());
    out
}

pub fn finished(score: Score, violations: u32) -> String {
    let mut out = format!("\nTest yakunlandi.\nNatija: {score}\n");
    if violations > 0 {
        out.push_str(&format!("Qoidabuzarliklar: {violations}\n"));
    }
    out.push_str(EXIT_PROMPT);
    out.push('\n');
    out
}

pub fn time_warning(remaining_seconds: u32) -> String {
    format!("Diqqat: {} vaqt qoldi.\n", format_countdown(remaining_seconds))
}

pub fn violation(count: u32) -> String {
    format!("Ogohlantirish: test oynasidan chiqildi ({count}-marta).\n")
}

pub fn notice(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Info => "[i]",
        NoticeLevel::Warning => "[!]",
        NoticeLevel::Error => "[x]",
    };
    format!("{tag} {}\n", notice.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionId;

    fn sample() -> Question {
        Question {
            id: QuestionId::from("1"),
            prompt: "2+2?".into(),
            options: vec!["3".into(), "4".into()],
            correct_option: "4".into(),
        }
    }

    #[test]
    fn question_view_marks_chosen_option() {
        let view = question(0, 2, Some(&sample()), Some("4"), 3599);
        assert!(view.contains("Savol 1 / 2"));
        assert!(view.contains("59:59"));
        assert!(view.contains("[ ] 1) 3"));
        assert!(view.contains("[x] 2) 4"));
    }

    #[test]
    fn empty_question_list_shows_zero_of_zero() {
        let view = question(0, 0, None, None, 3600);
        assert!(view.contains("Savol 0 / 0"));
        assert!(!view.contains("1)"));
    }

    #[test]
    fn finished_view_shows_score_line() {
        let view = finished(Score { correct: 1, total: 2 }, 0);
        assert!(view.contains("Natija: 1 / 2"));
        assert!(!view.contains("Qoidabuzarliklar"));

        let view = finished(Score { correct: 0, total: 0 }, 3);
        assert!(view.contains("Natija: 0 / 0"));
        assert!(view.contains("Qoidabuzarliklar: 3"));
    }

    #[test]
    fn notices_are_tagged_by_level() {
        assert_eq!(notice(&Notice::error("xato")), "[x] xato\n");
        assert_eq!(notice(&Notice::info("ok")), "[i] ok\n");
    }
}
