/// Points awarded for a correct pick. Scoring is flat; confidence is not weighted.
pub const POINTS_PER_CORRECT_PICK: u32 = 1;

/// Username length bounds, in characters
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;

/// Longest team, conference or league name accepted
pub const NAME_MAX_LEN: usize = 64;

/// Highest week number a game can be scheduled in
pub const MAX_WEEK: u32 = 25;
