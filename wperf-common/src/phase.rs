/// Number of softirq categories; also the raw value of [`Phase::Idle`].
pub const NR_SOFTIRQS: u8 = 10;

/// Logical work phase held in a core's correlation slot
///
/// Values `0..NR_SOFTIRQS` follow the kernel's own softirq dispatch priority
/// (lower runs first). The values above that are logical phases used only as
/// correlation state, never as hook targets.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    HiSoftirq = 0,
    TimerSoftirq = 1,
    NetTxSoftirq = 2,
    NetRxSoftirq = 3,
    BlockSoftirq = 4,
    IrqPollSoftirq = 5,
    TaskletSoftirq = 6,
    SchedSoftirq = 7,
    /// Unused by the kernel but kept so the numbering matches.
    HrtimerSoftirq = 8,
    RcuSoftirq = 9,
    /// No phase armed on this core
    Idle = NR_SOFTIRQS,
    HardIrq = NR_SOFTIRQS + 1,
    /// The deferred-work dispatcher (`ksoftirqd`) was signaled
    SoftDispatch = NR_SOFTIRQS + 2,
    /// A long-running kernel-internal operation (`__do_softirq`)
    Kernel = NR_SOFTIRQS + 3,
}

impl Phase {
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::HiSoftirq,
            1 => Self::TimerSoftirq,
            2 => Self::NetTxSoftirq,
            3 => Self::NetRxSoftirq,
            4 => Self::BlockSoftirq,
            5 => Self::IrqPollSoftirq,
            6 => Self::TaskletSoftirq,
            7 => Self::SchedSoftirq,
            8 => Self::HrtimerSoftirq,
            9 => Self::RcuSoftirq,
            10 => Self::Idle,
            11 => Self::HardIrq,
            12 => Self::SoftDispatch,
            13 => Self::Kernel,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    /// True for the ten softirq categories
    #[must_use]
    pub const fn is_softirq(self) -> bool {
        self.as_raw() < NR_SOFTIRQS
    }

    /// True while the core is serving or about to serve deferred work
    #[must_use]
    pub const fn is_bottom_half(self) -> bool {
        self.is_softirq() || matches!(self, Self::SoftDispatch)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HiSoftirq => "HI",
            Self::TimerSoftirq => "TIMER",
            Self::NetTxSoftirq => "NET_TX",
            Self::NetRxSoftirq => "NET_RX",
            Self::BlockSoftirq => "BLOCK",
            Self::IrqPollSoftirq => "IRQ_POLL",
            Self::TaskletSoftirq => "TASKLET",
            Self::SchedSoftirq => "SCHED",
            Self::HrtimerSoftirq => "HRTIMER",
            Self::RcuSoftirq => "RCU",
            Self::Idle => "IDLE",
            Self::HardIrq => "HARDIRQ",
            Self::SoftDispatch => "KSOFTIRQ",
            Self::Kernel => "KERNEL",
        }
    }
}
