//! Sharing one modem across tasks.
//!
//! [`A76xxClient`] enforces one-transaction-at-a-time through `&mut self`.
//! When several tasks need the same modem, park the client in an
//! [`embassy_sync::mutex::Mutex`] and hand each task a [`SharedA76xx`]; every
//! call locks for its full duration, so transactions from different tasks
//! serialize instead of interleaving on the wire.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Duration;

use crate::at::RawReply;
use crate::client::A76xxClient;
use crate::config::Transport;
use crate::error::Error;
use crate::network::ApnInfo;
use crate::socket::SocketState;

/// Cheap, copyable handle onto a mutex-guarded [`A76xxClient`].
pub struct SharedA76xx<'a, M: RawMutex, T: Transport> {
    client: &'a Mutex<M, A76xxClient<T>>,
}

impl<'a, M: RawMutex, T: Transport> Clone for SharedA76xx<'a, M, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, M: RawMutex, T: Transport> Copy for SharedA76xx<'a, M, T> {}

impl<'a, M: RawMutex, T: Transport> SharedA76xx<'a, M, T> {
    pub fn new(client: &'a Mutex<M, A76xxClient<T>>) -> Self {
        SharedA76xx { client }
    }

    pub async fn execute(&self, command: &str, timeout: Duration) -> Result<RawReply, Error> {
        self.client.lock().await.execute(command, timeout).await
    }

    pub async fn connect(
        &self,
        mux: u8,
        host: &str,
        port: u16,
        secure: bool,
        timeout: Duration,
    ) -> Result<bool, Error> {
        self.client
            .lock()
            .await
            .connect(mux, host, port, secure, timeout)
            .await
    }

    pub async fn send(&self, mux: u8, data: &[u8]) -> Result<usize, Error> {
        self.client.lock().await.send(mux, data).await
    }

    pub async fn read(&self, mux: u8, size: usize) -> Result<usize, Error> {
        self.client.lock().await.read(mux, size).await
    }

    pub async fn get_connected(&self, mux: u8) -> Result<bool, Error> {
        self.client.lock().await.get_connected(mux).await
    }

    pub async fn get_available(&self, mux: u8) -> Result<usize, Error> {
        self.client.lock().await.get_available(mux).await
    }

    pub async fn close(&self, mux: u8) -> Result<bool, Error> {
        self.client.lock().await.close(mux).await
    }

    pub async fn recv_slice(&self, mux: u8, out: &mut [u8]) -> usize {
        self.client.lock().await.recv_slice(mux, out)
    }

    pub async fn state(&self, mux: u8) -> SocketState {
        self.client.lock().await.state(mux)
    }

    pub async fn available(&self, mux: u8) -> usize {
        self.client.lock().await.available(mux)
    }

    pub async fn buffered_len(&self, mux: u8) -> usize {
        self.client.lock().await.buffered_len(mux)
    }

    pub async fn set_receive_timeout(&self, mux: u8, timeout: Duration) {
        self.client.lock().await.set_receive_timeout(mux, timeout);
    }

    pub async fn attach(&self, apn: &ApnInfo<'_>) -> Result<bool, Error> {
        self.client.lock().await.attach(apn).await
    }

    pub async fn detach(&self) -> Result<bool, Error> {
        self.client.lock().await.detach().await
    }

    pub async fn is_attached(&self) -> Result<bool, Error> {
        self.client.lock().await.is_attached().await
    }
}
