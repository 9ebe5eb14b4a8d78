//! Texts and keyboards shown to submitters

use super::Reply;
use crate::session::SessionState;
use crate::submission::{Activity, SubmissionType};

pub const CONFIRM_PROCEED: &str = "Confirm & Proceed";
pub const CONFIRM_SUBMIT: &str = "Confirm & Submit";
pub const CANCEL: &str = "Cancel";

pub const WELCOME: &str = "Welcome to the ULD Logistics Bot.\n\
    To start a new submission, use the /start command.\n\
    To review past submissions, use the /review command.\n\
    To abandon a submission in progress, use the /cancel command.";

pub const NOT_STARTED: &str = "There is no submission in progress. Use /start to begin.";
pub const CANCELLED: &str = "Submission cancelled.";
pub const FORMAT_ERROR: &str = "The format seems incorrect. Please provide the three pieces of \
    information, each on a new line:\n\
    1. Container/Reference Number\n\
    2. Number of Pallets/Cartons\n\
    3. Damage Notes/Remarks (or 'None' if not applicable)";
pub const PHOTO_MISSING: &str =
    "Please upload at least one photo before pressing 'Confirm & Proceed'.";
pub const DETAILS_MISSING: &str = "Please send the details (reference, quantity and notes, each \
    on a new line) before pressing 'Confirm & Proceed'.";
pub const ASK_OTHER_ACTIVITY: &str = "Please type the name of the activity.";
pub const EMPTY_ACTIVITY: &str = "The activity name cannot be empty. Please type it again.";
pub const MULTILINE_ACTIVITY: &str =
    "The activity name must fit on one line. Please type it again.";
pub const CONFIRM_PENDING: &str =
    "Please press 'Confirm & Submit' to send the submission, or 'Cancel' to discard it.";
pub const SUBMITTING: &str = "Submission confirmed! Uploading photos...";

pub fn choose_type() -> Reply {
    Reply::with_buttons(
        "Let's start a new submission.\nWhat kind of submission is this?",
        vec![SubmissionType::ALL.iter().map(|t| t.label()).collect::<Vec<_>>()],
    )
}

pub fn choose_type_again() -> Reply {
    Reply::with_buttons(
        "Please choose one of the options below.",
        vec![SubmissionType::ALL.iter().map(|t| t.label()).collect::<Vec<_>>()],
    )
}

pub fn choose_activity(intro: &str) -> Reply {
    let labels: Vec<&str> = Activity::ALL.iter().map(|a| a.label()).collect();
    Reply::with_buttons(
        intro,
        labels.chunks(3).map(|row| row.to_vec()).collect::<Vec<_>>(),
    )
}

/// Instructions for the detail block and photos
pub fn request_data() -> Reply {
    Reply::with_buttons(
        "Please provide the following details in a single message (or as the caption of \
         your first photo), with each item on a new line:\n\
         1. Container/Reference Number\n\
         2. Number of Pallets/Cartons\n\
         3. Damage Notes/Remarks (or 'None' if not applicable)\n\n\
         Then send your photos and press 'Confirm & Proceed' when you are finished.",
        vec![vec![CONFIRM_PROCEED, CANCEL]],
    )
}

pub fn details_received(photo_count: usize) -> Reply {
    let text = if photo_count == 0 {
        "Thank you. Now, please upload the required photos.".to_string()
    } else {
        format!(
            "Thank you. Details saved with {photo_count} photo(s) so far. \
             Press 'Confirm & Proceed' when you are finished."
        )
    };
    Reply::text(text)
}

pub fn photo_received(photo_count: usize, details_from_caption: bool) -> Reply {
    if details_from_caption {
        Reply::text(format!(
            "Details received from the caption. Photo {photo_count} received."
        ))
    } else {
        Reply::text(format!("Photo {photo_count} received."))
    }
}

pub fn not_expecting_photo() -> Reply {
    Reply::text("A photo was not expected at this step. Please follow the prompt above.")
}

/// Review summary shown before the final confirmation
pub fn summary(state: &SessionState) -> Vec<Reply> {
    let partial = &state.partial;
    let mut text = String::from("New Submission Summary\n\n");
    if let Some(submission_type) = partial.submission_type {
        text.push_str(&format!("Type: {submission_type}\n"));
    }
    if let Some(activity) = &partial.activity {
        text.push_str(&format!("Activity: {activity}\n"));
    }
    if let Some(details) = &partial.details {
        text.push_str(&format!(
            "Container/Reference: {}\nPallet/Carton Count: {}\nDamage Notes/Remarks:\n{}\n",
            details.reference, details.quantity, details.notes
        ));
    }
    text.push_str(&format!("\nPhotos Uploaded: {}", partial.photos.len()));

    vec![
        Reply::removing_keyboard(format!(
            "Thank you. {} photo(s) have been received.",
            partial.photos.len()
        )),
        Reply::text(text),
        Reply::with_buttons(
            "Please review the details above. If everything is correct, press 'Confirm & Submit'.",
            vec![vec![CONFIRM_SUBMIT, CANCEL]],
        ),
    ]
}
