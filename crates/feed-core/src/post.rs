//! Feed data model: posts, seed content, and the record decode boundary.

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use crate::store::Record;

/// Collection that holds post records.
pub const POSTS_COLLECTION: &str = "posts";

/// Column the feed is ordered by when fetching.
pub const CREATED_AT_COLUMN: &str = "created_at";

/// Author shown for rows that arrive without a `name`.
pub const DEFAULT_AUTHOR: &str = "Anonymous";

/// Maximum post body length in characters.
pub const MAX_BODY_CHARS: usize = 250;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("record {0} has no body")]
    MissingBody(i64),
}

/// Identifier of a feed entry.
///
/// Remote ids are assigned by the store on insert. Seed ids belong to the
/// built-in fallback posts, so the two can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostId {
    Remote(i64),
    Seed(u32),
}

/// A single feed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: PostId,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub body: String,
    pub photo_url: Option<String>,
}

impl Post {
    /// Decode a remote row into a `Post`.
    ///
    /// Rows without a `name` get [`DEFAULT_AUTHOR`]. Rows without a `body`
    /// are malformed and rejected rather than rendered.
    pub fn from_record(record: Record) -> Result<Self, DecodeError> {
        let body = record.body.ok_or(DecodeError::MissingBody(record.id))?;
        Ok(Self {
            id: PostId::Remote(record.id),
            author: record.name.unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            created_at: record.created_at,
            body,
            photo_url: record.photo_url,
        })
    }

    /// Creation date formatted for display, e.g. "October 21, 2025".
    pub fn display_date(&self) -> String {
        self.created_at.format("%B %-d, %Y").to_string()
    }
}

/// The built-in seed posts, in the fixed order they trail the feed in.
///
/// Never persisted and never mutated; shown after all remote posts, or alone
/// when the remote fetch fails or returns nothing.
pub fn seed_posts() -> Vec<Post> {
    vec![
        Post {
            id: PostId::Seed(1),
            author: "Alex Rivera".to_string(),
            created_at: seed_date(2025, 10, 21),
            body: "Had a great time collaborating on the group project today. Learned a lot \
                   about backend routing, API design, and database optimization. Working with \
                   a team really opens your eyes to different approaches and perspectives. We \
                   managed to implement some really cool features that I didn't think were \
                   possible at first. Feeling grateful for such supportive teammates who are \
                   always willing to help each other grow."
                .to_string(),
            photo_url: None,
        },
        Post {
            id: PostId::Seed(2),
            author: "Jamie Santos".to_string(),
            created_at: seed_date(2025, 10, 20),
            body: "Finally wrapped up my portfolio redesign — feeling accomplished! After \
                   weeks of tweaking colors, layouts, and animations, I think I've landed on \
                   something I'm really proud of. The process taught me so much about design \
                   principles, user experience, and attention to detail. It's amazing how much \
                   difference small changes can make in the overall feel of a site. Now time \
                   to start applying to opportunities!"
                .to_string(),
            photo_url: None,
        },
        Post {
            id: PostId::Seed(3),
            author: "Morgan Chen".to_string(),
            created_at: seed_date(2025, 10, 19),
            body: "Just finished a deep dive into TypeScript and I'm blown away by how much \
                   more confident I feel about my code now. Type safety is a game changer! The \
                   initial learning curve was steep, but now I can't imagine going back to \
                   plain JavaScript for larger projects. Highly recommend to anyone on the \
                   fence about learning it."
                .to_string(),
            photo_url: None,
        },
    ]
}

fn seed_date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}
