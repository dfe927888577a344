//! Plain-text views of threads, intake progress and loyalty standing.

use std::fmt::Write as _;

use ekami_core::{CommentTree, IntakeSession, TierProgress};
use ekami_domain::{short_id, CommentNode, IntakeForm, LoyaltyMember, LoyaltyTransaction};

/// One block per comment, indented two spaces per reply level.
pub fn render_thread(tree: &CommentTree) -> String {
    if tree.is_empty() {
        return "No comments yet.\n".to_string();
    }
    let mut out = String::new();
    for (depth, node) in tree.walk() {
        let indent = "  ".repeat(depth.saturating_sub(1));
        let _ = writeln!(out, "{indent}{}", comment_header(node));
        for line in node.comment.content.lines() {
            let _ = writeln!(out, "{indent}    {line}");
        }
    }
    out
}

fn comment_header(node: &CommentNode) -> String {
    let comment = &node.comment;
    let mut header = format!(
        "[{}] {} · {} like{}",
        short_id(comment.id),
        comment.author.display_name,
        comment.like_count,
        if comment.like_count == 1 { "" } else { "s" }
    );
    if node.liked_by_viewer {
        header.push_str(" (liked)");
    }
    if comment.is_pinned {
        header.push_str(" · pinned");
    }
    if comment.updated_at > comment.created_at {
        header.push_str(" · edited");
    }
    header
}

pub fn render_intake(session: &IntakeSession) -> String {
    let sequencer = session.sequencer();
    let mut out = format!(
        "Step {} / {}: {}\n",
        sequencer.position(),
        sequencer.total(),
        session.current_step()
    );
    out.push_str(&render_form(session.form()));
    out
}

pub fn render_form(form: &IntakeForm) -> String {
    let mut out = String::new();
    let service = if form.service.has_packages() {
        form.service
            .package_ids
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        or_dash(&form.service.custom_service)
    };
    let _ = writeln!(out, "  Service     : {service}");

    let vehicle = &form.vehicle;
    let _ = writeln!(
        out,
        "  Vehicle     : {}",
        or_dash(vehicle.label().trim())
    );
    if let Some(mileage) = vehicle.mileage {
        let _ = writeln!(out, "  Mileage     : {mileage} km");
    }
    if let Some(plate) = &vehicle.license_plate {
        let _ = writeln!(out, "  Plate       : {plate}");
    }

    let _ = writeln!(
        out,
        "  Problem     : {} ({} urgency)",
        or_dash(&form.problem.description),
        form.problem.urgency
    );
    let photos: Vec<&str> = form
        .photos
        .photos
        .iter()
        .map(|photo| photo.file_name.as_str())
        .collect();
    let _ = writeln!(
        out,
        "  Photos      : {}",
        if photos.is_empty() {
            "-".to_string()
        } else {
            photos.join(", ")
        }
    );

    let slot = &form.appointment;
    let when = match (slot.date, slot.time) {
        (Some(date), Some(time)) => format!("{date} {}", time.format("%H:%M")),
        (Some(date), None) => date.to_string(),
        (None, Some(time)) => format!("? {}", time.format("%H:%M")),
        (None, None) => "-".to_string(),
    };
    let _ = writeln!(out, "  Appointment : {when} ({})", slot.location);

    let contact = &form.contact;
    let _ = writeln!(
        out,
        "  Contact     : {} <{}> {}",
        or_dash(&contact.name),
        or_dash(&contact.email),
        or_dash(&contact.phone)
    );
    if let Some(notes) = &contact.notes {
        let _ = writeln!(out, "  Notes       : {notes}");
    }
    out
}

fn or_dash(value: &str) -> String {
    if value.trim().is_empty() {
        "-".to_string()
    } else {
        value.trim().to_string()
    }
}

pub fn render_member(
    member: &LoyaltyMember,
    progress: &TierProgress,
    discount_percent: u8,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  Tier        : {} ({discount_percent}% discount)", member.tier);
    let _ = writeln!(out, "  Available   : {} pts", member.available_points);
    let _ = writeln!(out, "  Lifetime    : {} pts", member.lifetime_points);
    match progress.next_tier {
        Some(next) => {
            let _ = writeln!(
                out,
                "  Progress    : {}% to {next} ({} pts to go)",
                progress.percent, progress.points_to_next
            );
        }
        None => {
            let _ = writeln!(out, "  Progress    : top tier reached");
        }
    }
    let activity = &member.activity;
    let _ = writeln!(
        out,
        "  Activity    : {} repairs, {} bookings, {} reviews, {} referrals",
        activity.repairs, activity.bookings, activity.reviews, activity.referrals
    );
    out
}

pub fn render_history(transactions: &[LoyaltyTransaction]) -> String {
    let mut out = String::new();
    for txn in transactions {
        let _ = writeln!(
            out,
            "  {}  {:>+7}  {}",
            txn.created_at.format("%Y-%m-%d"),
            txn.points,
            txn.description
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{TimeZone, Utc};
    use ekami_domain::{AuthorRef, Comment};
    use uuid::Uuid;

    use super::*;

    fn comment(n: u128, author: &str, content: &str, parent: Option<u128>) -> Comment {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, n as u32, 0).unwrap();
        let mut comment = Comment::new(
            Uuid::from_u128(0xfeed),
            AuthorRef {
                user_id: author.to_lowercase(),
                display_name: author.to_string(),
            },
            content,
            parent.map(Uuid::from_u128),
            at,
        );
        comment.id = Uuid::from_u128(n << 96);
        comment
    }

    #[test]
    fn thread_rendering_nests_replies_under_pinned_first() {
        let first = comment(1, "Amina", "Which oil grade for a 2015 Corolla?", None);
        let reply = comment(2, "Workshop", "5W-30 fully synthetic.", Some(1 << 96));
        let mut pinned = comment(3, "Workshop", "Read our service notes first.", None);
        pinned.is_pinned = true;
        pinned.like_count = 4;

        let mut liked = HashSet::new();
        liked.insert(pinned.id);
        let tree = CommentTree::build(&[first, reply, pinned], &liked);

        insta::assert_snapshot!(render_thread(&tree), @r###"
        [00000003] Workshop · 4 likes (liked) · pinned
            Read our service notes first.
        [00000001] Amina · 0 likes
            Which oil grade for a 2015 Corolla?
          [00000002] Workshop · 0 likes
              5W-30 fully synthetic.
        "###);
    }

    #[test]
    fn empty_thread_says_so() {
        let tree = CommentTree::build(&[], &HashSet::new());
        assert_eq!(render_thread(&tree), "No comments yet.\n");
    }
}
