use std::fmt;

/// Rank that owns coordinator duties: reduction, broadcast and gather.
pub const COORDINATOR_RANK: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Coordinator,
    Participant,
}

impl Role {
    pub fn for_rank(rank: usize) -> Self {
        if rank == COORDINATOR_RANK {
            Role::Coordinator
        } else {
            Role::Participant
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Coordinator => write!(f, "coordinator"),
            Role::Participant => write!(f, "participant"),
        }
    }
}

/// Identity handed to a worker for each stage it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerContext {
    pub rank: usize,
    pub role: Role,
    pub workers: usize,
}

impl WorkerContext {
    pub fn new(rank: usize, workers: usize) -> Self {
        Self {
            rank,
            role: Role::for_rank(rank),
            workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rank_zero_coordinates() {
        assert_eq!(Role::for_rank(0), Role::Coordinator);
        assert_eq!(Role::for_rank(1), Role::Participant);
        assert_eq!(WorkerContext::new(3, 4).role, Role::Participant);
    }
}
