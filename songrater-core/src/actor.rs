use std::{
    fmt::Display,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{
    bounded, tick, unbounded, Receiver, Select, SendError, Sender, TrySendError,
};

pub enum Act {
    Continue,
    Shutdown,
}

/// A message the actor sends itself every `interval`.
pub struct Timer<M> {
    pub interval: Duration,
    pub message: fn() -> M,
}

pub trait Actor: Sized {
    type Message: Send + 'static;
    type Error: Display;

    /// Runs on the actor thread before the first message.
    fn started(&mut self) {}

    fn handle(&mut self, msg: Self::Message) -> Result<Act, Self::Error>;

    fn process(mut self, recv: Receiver<Self::Message>, timers: Vec<Timer<Self::Message>>) {
        self.started();

        let ticks: Vec<(Receiver<Instant>, fn() -> Self::Message)> = timers
            .into_iter()
            .map(|timer| (tick(timer.interval), timer.message))
            .collect();
        let mut select = Select::new();
        let inbox = select.recv(&recv);
        let timer_ops: Vec<usize> = ticks.iter().map(|(ticker, _)| select.recv(ticker)).collect();

        loop {
            let oper = select.select();
            let index = oper.index();
            let msg = if index == inbox {
                match oper.recv(&recv) {
                    Ok(msg) => msg,
                    Err(_) => {
                        break;
                    }
                }
            } else {
                let Some(pos) = timer_ops.iter().position(|&op| op == index) else {
                    break;
                };
                let (ticker, message) = &ticks[pos];
                if oper.recv(ticker).is_err() {
                    break;
                }
                message()
            };
            match self.handle(msg) {
                Ok(Act::Continue) => {}
                Ok(Act::Shutdown) => {
                    break;
                }
                Err(err) => {
                    log::error!("error: {}", err);
                    break;
                }
            }
        }
    }

    fn spawn<F>(
        cap: Capacity,
        timers: Vec<Timer<Self::Message>>,
        factory: F,
    ) -> ActorHandle<Self::Message>
    where
        F: FnOnce(Sender<Self::Message>) -> Self + Send + 'static,
    {
        let (send, recv) = cap.to_channel();
        ActorHandle {
            sender: send.clone(),
            thread: thread::spawn(move || {
                factory(send).process(recv, timers);
            }),
        }
    }
}

pub struct ActorHandle<M> {
    thread: JoinHandle<()>,
    sender: Sender<M>,
}

impl<M> ActorHandle<M> {
    pub fn sender(&self) -> Sender<M> {
        self.sender.clone()
    }

    pub fn join(self) {
        let _ = self.thread.join();
    }

    pub fn send(&self, msg: M) -> Result<(), SendError<M>> {
        self.sender.send(msg)
    }

    pub fn try_send(&self, msg: M) -> Result<(), TrySendError<M>> {
        self.sender.try_send(msg)
    }
}

pub enum Capacity {
    Sync,
    Bounded(usize),
    Unbounded,
}

impl Capacity {
    pub fn to_channel<T>(&self) -> (Sender<T>, Receiver<T>) {
        match self {
            Capacity::Sync => bounded(0),
            Capacity::Bounded(cap) => bounded(*cap),
            Capacity::Unbounded => unbounded(),
        }
    }
}
