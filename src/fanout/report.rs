//! Report text and email composition

use crate::sinks::EmailMessage;
use crate::submission::Submission;
use crate::Result;
use serde::Serialize;
use tera::{Context, Tera};

const EMAIL_TEMPLATE: &str = r#"<html>
<body>
<h2>New Logistics Report</h2>
<ul>
{% for field in fields %}  <li><b>{{ field.question }}</b>: {{ field.answer }}</li>
{% endfor %}</ul>
<h3>Uploaded photos</h3>
{% if links %}<ul>
{% for link in links %}  <li><a href="{{ link }}">{{ link }}</a></li>
{% endfor %}</ul>{% else %}<p>No photos were uploaded.</p>{% endif %}
</body>
</html>
"#;

#[derive(Debug, Serialize)]
struct Field {
    question: &'static str,
    answer: String,
}

fn fields(submission: &Submission) -> Vec<Field> {
    let mut fields = vec![
        Field {
            question: "Timestamp",
            answer: submission.formatted_timestamp(),
        },
        Field {
            question: "Submitted by",
            answer: submission.submitter.to_string(),
        },
        Field {
            question: "Type",
            answer: submission.submission_type.to_string(),
        },
    ];
    if let Some(activity) = &submission.activity {
        fields.push(Field {
            question: "Activity",
            answer: activity.clone(),
        });
    }
    fields.extend([
        Field {
            question: "Container/Reference",
            answer: submission.reference.clone(),
        },
        Field {
            question: "Pallet/Carton Count",
            answer: submission.quantity.clone(),
        },
        Field {
            question: "Damage Notes/Remarks",
            answer: submission.notes.clone(),
        },
    ]);
    fields
}

/// Plain-text report posted to the operations group
pub fn report_text(submission: &Submission) -> String {
    let mut text = String::from("New Logistics Report\n\n");
    for field in fields(submission) {
        if field.question == "Damage Notes/Remarks" {
            text.push_str(&format!("{}:\n{}\n", field.question, field.answer));
        } else {
            text.push_str(&format!("{}: {}\n", field.question, field.answer));
        }
    }
    text.trim_end().to_string()
}

pub fn email_subject(submission: &Submission) -> String {
    match &submission.activity {
        Some(activity) => format!(
            "[{} - {}] {} ({})",
            submission.submission_type,
            activity,
            submission.reference,
            submission.formatted_timestamp()
        ),
        None => format!(
            "[{}] {} ({})",
            submission.submission_type,
            submission.reference,
            submission.formatted_timestamp()
        ),
    }
}

pub fn email_body(submission: &Submission, links: &[String]) -> Result<String> {
    let mut context = Context::new();
    context.insert("fields", &fields(submission));
    context.insert("links", links);
    Ok(Tera::one_off(EMAIL_TEMPLATE, &context, true)?)
}

pub fn compose_email(
    submission: &Submission,
    links: &[String],
    from: &str,
    to: &[String],
) -> Result<EmailMessage> {
    Ok(EmailMessage {
        from: from.to_string(),
        to: to.to_vec(),
        subject: email_subject(submission),
        html_body: email_body(submission, links)?,
    })
}
