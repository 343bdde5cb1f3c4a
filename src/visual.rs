//! Terminal rendering for the CLI front end.

use colored::*;

use crate::models::{Message, Role};
use crate::notice::{ConfigErrorPanel, Notice, NoticeVariant};
use crate::parameters::{ParamValue, ParameterType, Widget};
use crate::query::{DisplayParam, format_number};
use crate::ranking::{BadgeVariant, RankedSchool, badge_variant, format_similarity};

pub struct VisualOutput;

impl VisualOutput {
    pub fn ranking(schools: &[RankedSchool]) -> String {
        let mut out = format!(
            "{}\n{}\n",
            "School Rankings".bold(),
            "Based on similarity score from your query. Pick a rank to learn more.".dimmed()
        );
        out.push_str(&format!("{:<6}{:<60}{:>12}\n", "Rank", "School Name", "Similarity"));
        for school in schools {
            let rank = format!("{:<6}", school.rank);
            let rank = match badge_variant(school.rank) {
                BadgeVariant::Default => rank.bold().bright_yellow(),
                BadgeVariant::Secondary => rank.bold().white(),
                BadgeVariant::Outline => rank.normal(),
            };
            out.push_str(&format!(
                "{}{:<60}{:>12}\n",
                rank,
                school.name,
                format_similarity(school.similarity)
            ));
        }
        out
    }

    pub fn notice(notice: &Notice) -> String {
        match notice.variant {
            NoticeVariant::Default => {
                format!("{} {}", notice.title.bright_cyan().bold(), notice.description)
            }
            NoticeVariant::Destructive => {
                format!("{} {}", notice.title.red().bold(), notice.description.red())
            }
        }
    }

    pub fn config_panel(panel: &ConfigErrorPanel) -> String {
        format!("{}\n{}", panel.title.bold(), panel.message.red())
    }

    pub fn message(message: &Message) -> String {
        match message.role {
            Role::User => format!("{} {}", "you>".bright_cyan(), message.content),
            Role::Model => format!("{} {}", "bot>".bright_green(), message.content),
        }
    }

    pub fn query_details(similarity: Option<&str>, params: &[DisplayParam]) -> String {
        let mut badges: Vec<String> = similarity.map(str::to_string).into_iter().collect();
        badges.extend(params.iter().map(DisplayParam::badge));
        format!("{} {}", "Query Details:".bold(), badges.join(" | "))
    }

    pub fn widget(widget: &Widget) -> String {
        let value = match &widget.value {
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Number(n) => format_number(*n),
            ParamValue::Text(s) if s.is_empty() => widget.placeholder.clone().unwrap_or_default(),
            ParamValue::Text(s) => s.clone(),
        };
        let hint = match widget.kind {
            ParameterType::Select => format!(" [{}]", widget.options.join(", ")),
            ParameterType::Slider => format!(
                " [{}..{}]",
                format_number(widget.min.unwrap_or(0.0)),
                format_number(widget.max.unwrap_or(1.0))
            ),
            _ => String::new(),
        };
        format!("{}: {}{}", widget.label.bold(), value, hint.dimmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranking_table_rows() {
        colored::control::set_override(false);
        let rows = vec![
            RankedSchool {
                rank: 1,
                name: "A".into(),
                similarity: 0.9,
                image_url: "u1".into(),
            },
            RankedSchool {
                rank: 2,
                name: "B".into(),
                similarity: 0.5,
                image_url: "u2".into(),
            },
        ];
        let table = VisualOutput::ranking(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[3].starts_with("1     A"));
        assert!(lines[3].ends_with("90.00%"));
        assert!(lines[4].ends_with("50.00%"));
    }

    #[test]
    fn test_query_details_line() {
        colored::control::set_override(false);
        let params = vec![DisplayParam {
            label: "Urgent".into(),
            value: None,
        }];
        assert_eq!(
            VisualOutput::query_details(Some("Similarity: 50.00%"), &params),
            "Query Details: Similarity: 50.00% | Urgent"
        );
    }
}
