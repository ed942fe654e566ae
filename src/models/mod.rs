pub mod account;
pub mod card_progress;
pub mod deck;
pub mod deck_set;
pub mod flashcard;
pub mod sm2;
pub mod study_card;
pub mod study_session;
pub mod test_session;
pub mod usage;

pub use account::{Account, SubscriptionStatus, Tier};
pub use card_progress::CardProgress;
pub use deck::{Deck, DeckSummary};
pub use deck_set::DeckSet;
pub use flashcard::Flashcard;
pub use study_card::StudyCard;
pub use study_session::{StudySession, StudySummary};
pub use test_session::{
    GradedResponse, QuestionKind, TestQuestion, TestResponse, TestSession, TestStatus,
};
pub use usage::{UsageKind, UsagePeriod, UsageSnapshot};
