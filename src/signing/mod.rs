//! The signing flow.
//!
//! | Module     | Role                                                   |
//! |------------|--------------------------------------------------------|
//! | `submit`   | Upload the artifact and classify the immediate answer  |
//! | `poller`   | Poll the job status until it settles or times out      |
//! | `download` | Fetch the signed files concurrently                    |
//! | `signer`   | Compose the three into one `sign` call                 |

pub mod download;
pub mod poller;
pub mod signer;
pub mod submit;

pub use download::{DownloadOutcome, Downloader};
pub use poller::{PollConfig, PollOutcome, StatusPoller};
pub use signer::{SignResult, SignStatus, Signer};
pub use submit::{SigningRequest, SubmitOutcome, submit};
