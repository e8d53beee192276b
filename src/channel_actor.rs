//! A minimal actor on a bounded tokio channel.
//!
//! [`start`] spawns the message loop and returns an [`ActorRef`]. `tell` sends
//! without waiting and `ask` waits on a oneshot reply. Errors returned by a
//! handler are logged and the loop keeps going, except
//! [`ReimburseError::FatalError`], which stops the actor.

use log::{error, warn};
use tokio::sync::{mpsc, oneshot};

use crate::{map_channel_recv_err, map_channel_send_err, ReimburseError, ReimburseResult};

#[derive(Debug)]
pub struct ActorRef<M>
where
    M: Send,
{
    sender: mpsc::Sender<M>,
}

impl<M: Send + 'static> Clone for ActorRef<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<M: Send> ActorRef<M> {
    /// Fire-and-forget send. Waits for mailbox capacity.
    pub async fn tell(&self, msg: M) -> ReimburseResult<()> {
        self.sender.send(msg).await.map_err(map_channel_send_err)
    }

    /// Ask pattern: send a message and wait for a response.
    /// The message type `M` should contain an `oneshot::Sender<R>`.
    pub async fn ask<R>(&self, msg: M, response_channel: oneshot::Receiver<R>) -> ReimburseResult<R>
    where
        R: Send + 'static,
    {
        self.tell(msg).await?;
        response_channel.await.map_err(map_channel_recv_err)
    }
}

/// Actors implement this trait for their message type.
#[async_trait::async_trait]
pub trait ChannelActor<M>
where
    M: Send,
{
    async fn handle(&mut self, msg: M) -> ReimburseResult<()>;
}

/// Start an actor with bounded buffer size.
/// Spawns the actor loop on a tokio task and returns an `ActorRef`.
pub async fn start<A, M>(mut actor_instance: A, buf_size: usize) -> ActorRef<M>
where
    M: Send + 'static,
    A: ChannelActor<M> + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel(buf_size);
    let actor_ref = ActorRef { sender: tx };

    let _join_handle = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(err) = actor_instance.handle(msg).await {
                match err {
                    ReimburseError::FatalError => {
                        error!("actor stopped on fatal error");
                        break;
                    }
                    _ => {
                        warn!("actor error: {}", err);
                    }
                }
            }
        }
    });

    actor_ref
}
