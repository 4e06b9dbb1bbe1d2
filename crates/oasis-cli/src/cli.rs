use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use oasis_core::RecordId;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Inspect Wild Oasis cabins, guests and bookings."
)]
pub struct Cli {
    /// Path to the TOML configuration file (overrides OASIS_CONFIG).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print compact JSON instead of pretty JSON.
    #[arg(long, global = true)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// List every cabin, ordered by name.
    Cabins,

    /// Show one cabin.
    Cabin { id: RecordId },

    /// Show a cabin's regular price and discount.
    CabinPrice { id: RecordId },

    /// Look up a guest by email.
    Guest { email: String },

    /// Show one booking.
    Booking { id: RecordId },

    /// List a guest's bookings with their cabin.
    Bookings { guest_id: RecordId },

    /// List the dates a cabin is unavailable.
    BookedDates {
        cabin_id: RecordId,

        /// Treat this date (YYYY-MM-DD) as today instead of the current UTC date.
        #[arg(long = "as-of")]
        as_of: Option<NaiveDate>,
    },

    /// Show the booking settings.
    Settings,

    /// Fetch the public country list.
    Countries,

    /// Delete a booking and print what it was.
    DeleteBooking { id: RecordId },

    /// Verify the database is reachable and has the expected tables.
    Check,
}
