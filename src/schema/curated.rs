//! Hand-written annotations for the events table.
//!
//! Keys keep the casing they were written with; lookups go through
//! [`super::lookup`] so `SITE`, `site` and `Site` all resolve.

use super::ColumnInfo;
use std::collections::HashMap;

// (name, type, description, possible values)
const CURATED: &[(&str, &str, &str, Option<&str>)] = &[
    (
        "date",
        "DATE",
        "Event date",
        None,
    ),
    (
        "event_time",
        "TIMESTAMP",
        "Event timestamp",
        None,
    ),
    (
        "event_name",
        "VARCHAR",
        "The event name",
        Some("page_view, play, click, ads, engagement"),
    ),
    (
        "calculated_visit_id",
        "BIGINT",
        "The user's visit ID calculated since start of the visit until 30 minutes of inactivity. This is the relevant visit_id to use for session analysis.",
        None,
    ),
    (
        "user_id",
        "VARCHAR",
        "The user's ID. Users have the same ID that is dependent on the device.",
        None,
    ),
    (
        "item_id",
        "VARCHAR",
        "The item ID the event happened for. For example, a page view for a specific article.",
        None,
    ),
    (
        "channel_id",
        "VARCHAR",
        "The channel that the item is connected to.",
        None,
    ),
    (
        "content_type",
        "VARCHAR",
        "The content type of the item.",
        None,
    ),
    (
        "visit_first_event",
        "BIGINT",
        "1 if this is the first event in the user's visit, null otherwise. Useful for counting visits.",
        Some("1 or null"),
    ),
    (
        "push_id",
        "BIGINT",
        "The ID of the push notification the user started the visit from.",
        None,
    ),
    (
        "play_id",
        "VARCHAR",
        "The ID of the play event. Stays the same as long as the user is watching the same video.",
        None,
    ),
    (
        "action",
        "VARCHAR",
        "The action the user did. Mostly relevant during play events.",
        Some("skip_backwards, skip_forward, error, mute, share, display, start, resume, change_display, pause, seek, startover, complete, play, close, live_rt, fallback, change_state, unmute, skip, change_speed, continue_watch"),
    ),
    (
        "reason",
        "VARCHAR",
        "The reason for the action. Mostly relevant for the action field.",
        Some("scroll, end_manual_next_episode, user_idle, next_episode, back, auto_swipe, app_background, dvr_back, more_episodes, user, buffering, midroll, share, user_player_pause, epg, preroll, dvr, swipe, auto_next_episode, click"),
    ),
    (
        "previous_action",
        "VARCHAR",
        "The action of the previous event.",
        Some("skip_backwards, skip_forward, error, mute, share, display, start, resume, change_display, pause, seek, startover, complete, play, close, live_rt, fallback, change_state, unmute, skip, change_speed, continue_watch"),
    ),
    (
        "previous_reason",
        "VARCHAR",
        "The reason of the previous event.",
        Some("scroll, end_manual_next_episode, user_idle, next_episode, back, auto_swipe, app_background, dvr_back, more_episodes, user, buffering, midroll, share, user_player_pause, epg, preroll, dvr, swipe, auto_next_episode, click"),
    ),
    (
        "type",
        "VARCHAR",
        "The ad type.",
        Some("video, display"),
    ),
    (
        "sub_type",
        "VARCHAR",
        "The ad subtype.",
        Some("preroll, cube, article, monster, jambo, native, parallax, standard, full_screen, prime, banner, ozen, poster, inboard, coast2coast, video_paused_ad, midroll"),
    ),
    (
        "ENGAGEMENT_TYPE",
        "VARCHAR",
        "The type of engagement.",
        Some("share, comment, feelings, interaction"),
    ),
    (
        "ENGAGEMENT_DETAILS",
        "VARCHAR",
        "The details of the engagement type.",
        Some("whatsapp, open_sticky_player, twitter, allow_push_notifications, deny_push_notifications, sticky_player_off, copy_link, events_summary, contact_us, loved, comment, close_sticky_player, sticky_player_on, arrow_up, reply, didnt_love, facebook, x_sticky_player"),
    ),
    (
        "SITE",
        "VARCHAR",
        "The site where the visit happened.",
        Some("n12, 12plus, v1, mako"),
    ),
    (
        "ABSOLUTE_VISIT_REF",
        "VARCHAR",
        "The referrer website.",
        Some("facebook, google, direct, etc."),
    ),
    (
        "DEVICE_TYPE",
        "VARCHAR",
        "The device type used.",
        Some("tablet, Unknown, mobile, web, smart_tv"),
    ),
    (
        "DEVICE_OS",
        "VARCHAR",
        "The OS of the device.",
        Some("Windows, hisense, iOS, Linux, Tizen, Apple TVOS, Android, iPadOS, Chrome OS, PlayStation 4, browser, macOS, webos, tizen, tvOS"),
    ),
    (
        "IL_OR_ABROAD",
        "VARCHAR",
        "Indicator for the user's location - Israel or abroad.",
        Some("unknown, abroad, il"),
    ),
    (
        "PLATFORM",
        "VARCHAR",
        "The platform the user is visiting from.",
        Some("mobile-app, smart_tv-app, tablet-browser, unknown, browser, tablet-app, mobile-browser"),
    ),
];

pub fn columns() -> HashMap<String, ColumnInfo> {
    CURATED
        .iter()
        .map(|(name, data_type, description, values)| {
            (
                name.to_string(),
                ColumnInfo {
                    description: description.to_string(),
                    data_type: data_type.to_string(),
                    values: values.map(|v| v.to_string()),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curated_keys_are_unique() {
        assert_eq!(columns().len(), CURATED.len());
    }

    #[test]
    fn mixed_case_keys_resolve() {
        let map = columns();
        assert!(super::super::lookup(&map, "platform").is_some());
        assert!(super::super::lookup(&map, "Event_Name").is_some());
        assert!(super::super::lookup(&map, "device_os").is_some());
        assert!(super::super::lookup(&map, "eventname").is_none());
    }
}
