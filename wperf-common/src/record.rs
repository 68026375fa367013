use crate::Phase;

/// Event tag carried in [`TraceRecord::kind`]
///
/// Participant identifiers for each kind are listed as `subject` / `object`.
/// They are kernel addresses used only as identity, never dereferenced.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `__switch_to`: subject = previous task, object = next task
    SwitchTo = 1,
    /// `try_to_wake_up`: subject = task, arg = state mask
    TryToWakeUp = 2,
    /// `wake_up_new_task`: subject = new task
    WakeUpNewTask = 3,
    /// `do_exit`: arg = exit code
    DoExit = 4,
    /// `futex_wait_queue_me`: subject = hash bucket, object = futex queue
    FutexWaitQueue = 5,
    /// `do_futex`: subject = user address, arg = op
    DoFutex = 6,
    /// `journal_end_buffer_io_sync`: subject = buffer head, arg = uptodate
    JournalIoSync = 7,
    /// `part_round_stats`: subject = partition, arg = cpu
    PartRoundStats = 8,
    /// `tcp_sendmsg`: subject = socket, arg = size
    TcpSendmsg = 9,
    /// `udp_sendmsg`: subject = socket, arg = length
    UdpSendmsg = 10,
    /// `tcp_sendpage`: subject = socket, object = page, arg = size
    TcpSendpage = 11,
    /// `udp_sendpage`: subject = socket, object = page, arg = size
    UdpSendpage = 12,
    /// `sock_sendmsg`: subject = socket
    SockSendmsg = 13,
    /// `__lock_sock`: subject = socket
    LockSock = 14,
    /// `__do_softirq` return: `elapsed_ns` since entry, flag = pair intact
    SoftirqDispatch = 15,
}

impl EventKind {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            1 => Self::SwitchTo,
            2 => Self::TryToWakeUp,
            3 => Self::WakeUpNewTask,
            4 => Self::DoExit,
            5 => Self::FutexWaitQueue,
            6 => Self::DoFutex,
            7 => Self::JournalIoSync,
            8 => Self::PartRoundStats,
            9 => Self::TcpSendmsg,
            10 => Self::UdpSendmsg,
            11 => Self::TcpSendpage,
            12 => Self::UdpSendpage,
            13 => Self::SockSendmsg,
            14 => Self::LockSock,
            15 => Self::SoftirqDispatch,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    /// Name of the instrumented function this event is reported as
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SwitchTo => "__switch_to",
            Self::TryToWakeUp => "try_to_wake_up",
            Self::WakeUpNewTask => "wake_up_new_task",
            Self::DoExit => "do_exit",
            Self::FutexWaitQueue => "futex_wait_queue_me",
            Self::DoFutex => "do_futex",
            Self::JournalIoSync => "journal_end_buffer_io_sync",
            Self::PartRoundStats => "part_round_stats",
            Self::TcpSendmsg => "tcp_sendmsg",
            Self::UdpSendmsg => "udp_sendmsg",
            Self::TcpSendpage => "tcp_sendpage",
            Self::UdpSendpage => "udp_sendpage",
            Self::SockSendmsg => "sock_sendmsg",
            Self::LockSock => "__lock_sock",
            Self::SoftirqDispatch => "__do_softirq",
        }
    }
}

/// Event sent from the probe programs to userspace via ring buffer
///
/// **Memory Layout**: `#[repr(C)]`, 56 bytes, no implicit padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceRecord {
    /// Raw [`EventKind`]
    pub kind: u32,

    /// Core the hook fired on
    pub cpu: u32,

    /// Monotonic timestamp (`bpf_ktime_get_ns`) taken when the hook fired
    pub timestamp_ns: u64,

    /// First participant identifier (task, socket, buffer, ...), 0 if none
    pub subject: u64,

    /// Second participant identifier, 0 if none
    pub object: u64,

    /// Kind-specific scalar argument
    pub arg: u64,

    /// Elapsed time for paired begin/end events, 0 otherwise
    pub elapsed_ns: u64,

    /// Raw [`Phase`] of the core when the event was emitted
    pub phase: u8,

    /// Kind-specific flag
    ///
    /// - Notifications: 1 if the core was in a bottom-half phase
    /// - `SoftirqDispatch`: 1 if the begin timestamp was armed on this core
    pub flag: u8,

    #[allow(clippy::pub_underscore_fields)]
    pub _padding: [u8; 6],
}

impl TraceRecord {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    #[must_use]
    pub fn event_kind(&self) -> Option<EventKind> {
        EventKind::from_raw(self.kind)
    }

    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        Phase::from_raw(self.phase)
    }
}
